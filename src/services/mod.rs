pub mod page_resolver;
pub mod web_xml;

pub use page_resolver::PageResolver;
pub use web_xml::{ServletMapping, WebDescriptor, WebXmlFragment};
