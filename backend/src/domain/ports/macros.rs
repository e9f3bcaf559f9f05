//! Helper macro generating port error enums with snake_case constructors.

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            #[doc = concat!("Construct [`Self::", stringify!($variant), "`].")]
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        define_port_error!(@ctor_impl $variant () () $( $field : $ty, )*);
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) ) => {
        ::paste::paste! {
            #[doc = concat!("Construct [`Self::", stringify!($variant), "`].")]
            pub fn [<$variant:snake>]($($params)*) -> Self {
                Self::$variant { $($inits)* }
            }
        }
    };

    (@ctor_impl $variant:ident ($($params:tt)*) ($($inits:tt)*) $field:ident : $ty:ty, $($rest:tt)*) => {
        define_port_error!(
            @ctor_impl
            $variant
            ($($params)* $field: impl Into<$ty>,)
            ($($inits)* $field: $field.into(),)
            $($rest)*
        );
    };
    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )? => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( {
                    $(
                        #[allow(missing_docs, reason = "fields are described by the variant message")]
                        $field : $ty
                    ),*
                } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    define_port_error! {
        pub enum ProbePortError {
            Unreachable { message: String } => "store unreachable: {message}",
            Status { status: u16 } => "unexpected status {status}",
            Rejected { message: String, status: u16 } => "rejected ({status}): {message}",
            Closed => "port closed",
        }
    }

    #[test]
    fn string_fields_accept_str_slices() {
        let err = ProbePortError::unreachable("connection refused");
        assert_eq!(err.to_string(), "store unreachable: connection refused");
    }

    #[test]
    fn numeric_fields_keep_their_type() {
        let err = ProbePortError::status(503_u16);
        assert_eq!(err.to_string(), "unexpected status 503");
    }

    #[test]
    fn mixed_fields_and_unit_variants_are_supported() {
        assert_eq!(
            ProbePortError::rejected("duplicate", 409_u16).to_string(),
            "rejected (409): duplicate"
        );
        assert_eq!(ProbePortError::closed().to_string(), "port closed");
    }
}
