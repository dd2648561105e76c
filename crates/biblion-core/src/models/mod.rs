pub mod article;
pub mod cooked;
pub mod field;
pub mod record;
pub mod registry;
pub mod resource;

pub use article::*;
pub use cooked::*;
pub use field::*;
pub use record::*;
pub use registry::*;
pub use resource::*;
