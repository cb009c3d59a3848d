//! Build dimensions, each one a set of flags.

use std::fmt::Debug;
use std::hash::Hash;

/// A single axis of the target matrix.
///
/// Implementors are flag sets where a value may hold several flags at once, e.g.
/// `Optimization::DEBUG | Optimization::RELEASE` means "one target per optimization level".
pub trait Dimension: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static {
    /// Name of the dimension, as used by `[target.<NAME>]` placeholders.
    const NAME: &'static str;
    /// Every flag of this dimension, in declaration order.
    const FLAGS: &'static [Self];
    /// No flag at all.
    const EMPTY: Self;
    /// Every flag at once.
    const ALL: Self;

    /// Label of a single flag, `None` if `self` is empty or a combination.
    fn label(self) -> Option<&'static str>;

    /// Parse a single flag from its label, ignoring case.
    fn from_label(label: &str) -> Option<Self>;

    /// Whether `self` contains every flag of `other`.
    fn has(self, other: Self) -> bool;

    /// Splits a combination into its single flags, in declaration order.
    fn singles(self) -> impl Iterator<Item = Self> {
        Self::FLAGS.iter().copied().filter(move |flag| self.has(*flag))
    }

    /// Number of single flags in this combination.
    fn count(self) -> usize {
        self.singles().count()
    }
}

macro_rules! dimension {
    (
        $(#[$meta:meta])*
        $name:ident as $dim_name:literal {
            $( $flag:ident = $bit:expr => $label:literal, )+
        }
    ) => {
        bitflags::bitflags! {
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
            pub struct $name: u32 {
                $( const $flag = $bit; )+
            }
        }

        impl Dimension for $name {
            const NAME: &'static str = $dim_name;
            const FLAGS: &'static [Self] = &[ $( $name::$flag, )+ ];
            const EMPTY: Self = $name::empty();
            const ALL: Self = $name::all();

            fn label(self) -> Option<&'static str> {
                $( if self == $name::$flag { return Some($label); } )+
                None
            }

            fn from_label(label: &str) -> Option<Self> {
                $( if label.eq_ignore_ascii_case($label) { return Some($name::$flag); } )+
                None
            }

            fn has(self, other: Self) -> bool {
                self.contains(other)
            }
        }
    };
}

dimension! {
    /// The development environment (IDE version) a target is generated for.
    DevEnv as "DevEnv" {
        VS2017 = 1 << 0 => "vs2017",
        VS2019 = 1 << 1 => "vs2019",
        VS2022 = 1 << 2 => "vs2022",
        VS2026 = 1 << 3 => "vs2026",
        XCODE = 1 << 4 => "xcode",
    }
}

dimension! {
    /// The platform a target produces binaries for.
    Platform as "Platform" {
        WIN32 = 1 << 0 => "win32",
        WIN64 = 1 << 1 => "win64",
        MAC = 1 << 2 => "mac",
    }
}

dimension! {
    /// The compiler toolchain used within a development environment.
    Compiler as "Compiler" {
        MSBUILD = 1 << 0 => "MSBuild",
        CLANG = 1 << 1 => "Clang",
    }
}

dimension! {
    Optimization as "Optimization" {
        DEBUG = 1 << 0 => "Debug",
        RELEASE = 1 << 1 => "Release",
    }
}

/// Names a dimension without carrying a value, e.g. to pick the discriminator of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DimensionKind {
    DevEnv,
    Platform,
    Compiler,
    Optimization,
}

impl DimensionKind {
    pub const ALL: [DimensionKind; 4] = [
        DimensionKind::DevEnv,
        DimensionKind::Platform,
        DimensionKind::Compiler,
        DimensionKind::Optimization,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DimensionKind::DevEnv => DevEnv::NAME,
            DimensionKind::Platform => Platform::NAME,
            DimensionKind::Compiler => Compiler::NAME,
            DimensionKind::Optimization => Optimization::NAME,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        DimensionKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }
}
