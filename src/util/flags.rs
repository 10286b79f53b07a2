/// Defines a `u32` bit set newtype with named flags.
/// Debug output lists the names of the set bits.
macro_rules! flag_set {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$flag_meta:meta])*
                const $flag:ident = $value:expr;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        #[repr(transparent)]
        $vis struct $name(u32);

        #[allow(dead_code)]
        impl $name {
            pub const EMPTY: Self = Self(0);
            $(
                $(#[$flag_meta])*
                pub const $flag: Self = Self($value);
            )*

            const NAMED: &'static [(&'static str, u32)] = &[$((stringify!($flag), $value)),*];

            pub const fn from_bits(bits: u32) -> Self {
                Self(bits)
            }

            pub const fn bits(self) -> u32 {
                self.0
            }

            /// All bits of `other` are set in `self`.
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            /// At least one bit is shared between `self` and `other`.
            pub const fn intersects(self, other: Self) -> bool {
                self.0 & other.0 != 0
            }

            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl std::ops::BitAnd for $name {
            type Output = Self;
            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let mut set = f.debug_set();
                for value in (0..u32::BITS).map(|bit| 1u32 << bit).filter(|v| self.0 & v != 0) {
                    match Self::NAMED.iter().find(|(_, v)| *v == value) {
                        Some((name, _)) => set.entry(&format_args!("{name}")),
                        None => set.entry(&format_args!("{value:#x}")),
                    };
                }
                set.finish()
            }
        }
    };
}

pub(crate) use flag_set;

#[cfg(test)]
mod test {
    use assert2::assert;

    flag_set! {
        struct TestFlags {
            const A = 1 << 0;
            const B = 1 << 1;
            const AB = (1 << 0) | (1 << 1);
        }
    }

    #[test]
    fn contains_and_intersects() {
        let a = TestFlags::A;
        assert!(TestFlags::AB.contains(a));
        assert!(!a.contains(TestFlags::AB));
        assert!(a.intersects(TestFlags::AB));
        assert!(!a.intersects(TestFlags::B));
        assert!((a | TestFlags::B) == TestFlags::AB);
        assert!((TestFlags::AB & TestFlags::B) == TestFlags::B);
        assert!(TestFlags::default().is_empty());
    }

    #[test]
    fn debug_lists_names() {
        assert!(format!("{:?}", TestFlags::A | TestFlags::B) == "{A, B}");
        assert!(format!("{:?}", TestFlags::from_bits(1 << 4)) == "{0x10}");
        assert!(format!("{:?}", TestFlags::EMPTY) == "{}");
    }
}
