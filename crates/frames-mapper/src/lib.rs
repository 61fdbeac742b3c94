mod config;
mod dereference;
mod embed;
mod error;
mod mapper;
mod paginate;
mod path;
mod projection;
mod record;
mod schema;
mod value;

pub use config::MapperConfig;
pub use error::FrameError;
pub use mapper::Mapper;
pub use paginate::{Page, Paginator, PaginatorOptions};
pub use path::PathCache;
pub use projection::{Compiled, Directive, Embed, Projection, Reference, compile};
pub use record::Record;
pub use schema::Schema;
pub use value::{Document, Value};
