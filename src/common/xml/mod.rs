//! XML text helpers used by the serializers.

mod escape;

pub use escape::escape_xml;
