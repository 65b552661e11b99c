//! Typed callables - unpack `AnyView` arguments, repack the return value
//!
//! A closure `Fn(A, B) -> R` is callable through the packed convention when
//! every argument is `FromAny` and `R` is `IntoAny`. Closures returning
//! `Result<R>` propagate their error instead. The marker type parameter
//! keeps the per-arity impls apart.

use crate::any::{Any, AnyView, FromAny, IntoAny};
use crate::error::{Error, Result};

/// Marker for closures returning a plain value
pub struct Plain;

/// Marker for closures returning `Result`
pub struct Fallible;

/// A Rust callable usable as a packed function
pub trait TypedFunction<Marker>: Send + Sync + 'static {
    const ARITY: usize;

    /// `(int, str)` style argument list for error messages
    fn signature() -> String;

    fn call_unpacked(&self, name: &str, args: &[AnyView<'_>]) -> Result<Any>;
}

fn signature_of(arg_types: &[String]) -> String {
    format!("({})", arg_types.join(", "))
}

fn check_arity(name: &str, signature: &str, expected: usize, got: usize) -> Result<()> {
    if expected == got {
        return Ok(());
    }
    Err(Error::type_error(format!(
        "Mismatched number of arguments when calling: `{}{}`. Expected {} but got {} arguments",
        name, signature, expected, got
    )))
}

fn unpack_arg<T: FromAny>(
    name: &str,
    signature: fn() -> String,
    args: &[AnyView<'_>],
    index: usize,
) -> Result<T> {
    let view = args.get(index).copied().unwrap_or_default();
    view.try_cast::<T>().ok_or_else(|| {
        Error::type_error(format!(
            "Mismatched type on argument #{} when calling: `{}{}`. Expected `{}` but got `{}`",
            index,
            name,
            signature(),
            T::type_str(),
            view.type_key()
        ))
    })
}

macro_rules! impl_typed_function {
    ($count:expr; $($arg:ident $idx:tt),*) => {
        impl<Func, Ret, $($arg,)*> TypedFunction<(Plain, Ret, $($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Ret + Send + Sync + 'static,
            Ret: IntoAny,
            $($arg: FromAny,)*
        {
            const ARITY: usize = $count;

            fn signature() -> String {
                signature_of(&[$(<$arg as FromAny>::type_str()),*])
            }

            #[allow(unused_variables)]
            fn call_unpacked(&self, name: &str, args: &[AnyView<'_>]) -> Result<Any> {
                check_arity(name, &Self::signature(), $count, args.len())?;
                Ok(Any::new((self)(
                    $(unpack_arg::<$arg>(name, Self::signature, args, $idx)?),*
                )))
            }
        }

        impl<Func, Ret, $($arg,)*> TypedFunction<(Fallible, Ret, $($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Result<Ret> + Send + Sync + 'static,
            Ret: IntoAny,
            $($arg: FromAny,)*
        {
            const ARITY: usize = $count;

            fn signature() -> String {
                signature_of(&[$(<$arg as FromAny>::type_str()),*])
            }

            #[allow(unused_variables)]
            fn call_unpacked(&self, name: &str, args: &[AnyView<'_>]) -> Result<Any> {
                check_arity(name, &Self::signature(), $count, args.len())?;
                let value = (self)($(unpack_arg::<$arg>(name, Self::signature, args, $idx)?),*)?;
                Ok(Any::new(value))
            }
        }
    };
}

impl_typed_function!(0;);
impl_typed_function!(1; A0 0);
impl_typed_function!(2; A0 0, A1 1);
impl_typed_function!(3; A0 0, A1 1, A2 2);
impl_typed_function!(4; A0 0, A1 1, A2 2, A3 3);
impl_typed_function!(5; A0 0, A1 1, A2 2, A3 3, A4 4);
impl_typed_function!(6; A0 0, A1 1, A2 2, A3 3, A4 4, A5 5);
