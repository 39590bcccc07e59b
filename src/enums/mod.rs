//! Enumerations of the PowerPoint object model.
//!
//! Each table mirrors an Office VBA enumeration: members carry the numeric
//! value used by the object model and a short description. Tables whose
//! members appear as DrawingML attribute values also convert to and from
//! their XML form.

use thiserror::Error;

/// Errors converting enumeration members to or from XML.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnumError {
    #[error("{enum_name}.{member} has no XML representation")]
    NotXmlMapped {
        enum_name: &'static str,
        member: &'static str,
    },

    #[error("'{value}' is not a valid {enum_name} XML value")]
    UnknownXmlValue { enum_name: &'static str, value: String },
}

/// Declares an object-model enumeration.
///
/// Generates the enum with explicit `i32` discriminants, the `MS_NAME`,
/// `URL` and `ALL` constants, and `value`, `description`, `from_value` and
/// `Display`. XML mapping is written by hand next to the tables that have one.
macro_rules! ms_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($ms_name:literal, $url:literal) {
            $( $variant:ident = $value:literal, $desc:literal; )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[repr(i32)]
        pub enum $name {
            $(
                #[doc = $desc]
                $variant = $value,
            )+
        }

        impl $name {
            /// Name of the enumeration in the Office object model.
            pub const MS_NAME: &'static str = $ms_name;

            /// Reference documentation for the enumeration.
            pub const URL: &'static str = $url;

            /// Every member, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Numeric value of the member in the object model.
            #[inline]
            pub const fn value(self) -> i32 {
                self as i32
            }

            /// Short description of the member.
            pub const fn description(self) -> &'static str {
                match self {
                    $(Self::$variant => $desc,)+
                }
            }

            /// Look up a member by its numeric value.
            pub const fn from_value(value: i32) -> Option<Self> {
                match value {
                    $($value => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Member name as written in this crate, e.g. `BarClustered`.
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{} ({})", self.name(), self.value())
            }
        }
    };
}


pub mod chart;

pub use chart::{XlChartType, XlLegendPosition, XlTickLabelPosition, XlTickMark};
