//!
//! # Enum-String Pairing
//!
//! Instance kinds and technology layers both arrive as short strings in
//! configuration files ("PN", "m2") and are written back out the same way.
//! The [enumstr] macro declares such an enum along with its [EnumStr] mapping.
//!

///
/// # String-Enumeration Trait
///
/// * `to_str(&self) -> &'static str` converts the enum to its string value.
/// * `from_str(&str) -> Option<Self>` does the opposite, or returns `None`.
///
pub trait EnumStr: std::marker::Sized + 'static {
    fn to_str(&self) -> &'static str;
    fn from_str(txt: &str) -> Option<Self>;
}

///
/// # Enum-String Pairing Macro
///
/// Declares a fieldless `enum` which:
/// * Derives the common value-traits, plus `serde` (de)serialization,
/// * Implements [EnumStr] over its paired string-values, and
/// * Implements [std::fmt::Display] writing those string-values.
///
/// ```
/// use gates21::enumstr;
/// use gates21::enumstr::EnumStr;
///
/// enumstr!(
///     /// # Supply Rails
///     Rail {
///         Vdd: "vdd",
///         Gnd: "gnd",
///     }
/// );
/// assert_eq!(Rail::from_str("gnd"), Some(Rail::Gnd));
/// assert_eq!(Rail::Vdd.to_string(), "vdd");
/// ```
///
#[macro_export]
macro_rules! enumstr {
    (   $(#[$meta: meta])*
        $enum_name: ident {
        $( $variant: ident : $strval: literal ),* $(,)?
    }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, ::serde::Deserialize, ::serde::Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $enum_name {
            $( #[doc=$strval]
                $variant ),*
        }
        impl $crate::enumstr::EnumStr for $enum_name {
            fn to_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $strval),*,
                }
            }
            /// Case-sensitive match against the paired string-values
            fn from_str(txt: &str) -> Option<Self> {
                match txt {
                    $( $strval => Some(Self::$variant)),*,
                    _ => None,
                }
            }
        }
        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                f.write_str($crate::enumstr::EnumStr::to_str(self))
            }
        }
    }
}
