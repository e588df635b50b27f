//! Positional params of an outgoing call
//!
//! Params are given as a tuple, and each element becomes exactly one entry
//! of the positional params array, whatever its own shape:
//!
//! | Rust params              | Wire params      |
//! |--------------------------|------------------|
//! | `()`                     | `[]`             |
//! | `("a",)`                 | `["a"]`          |
//! | `(vec![1, 2, 3],)`       | `[[1, 2, 3]]`    |
//! | `(None::<i32>, 4)`       | `[null, 4]`      |
//!
//! Params that are already encoded go through
//! [`BatchClient::call_raw`](crate::BatchClient::call_raw) instead.

use jbatch_core::{Error, Result};
use serde::Serialize;
use serde_json::Value;

/// Values that can be sent as positional params
///
/// Implemented for `()` and for tuples of up to twelve serializable elements.
pub trait Params {
    /// Encode into the positional params array
    ///
    /// Fails with [`Error::InvalidParams`] when an element cannot be
    /// serialized.
    fn into_params(self) -> Result<Vec<Value>>;
}

impl Params for () {
    fn into_params(self) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }
}

fn encode<T: Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::InvalidParams(e.to_string()))
}

macro_rules! impl_params_for_tuple {
    ($($ty:ident $var:ident),+) => {
        impl<$($ty: Serialize),+> Params for ($($ty,)+) {
            fn into_params(self) -> Result<Vec<Value>> {
                let ($($var,)+) = self;
                Ok(vec![$(encode($var)?),+])
            }
        }
    };
}

impl_params_for_tuple!(A a);
impl_params_for_tuple!(A a, B b);
impl_params_for_tuple!(A a, B b, C c);
impl_params_for_tuple!(A a, B b, C c, D d);
impl_params_for_tuple!(A a, B b, C c, D d, E e);
impl_params_for_tuple!(A a, B b, C c, D d, E e, F f);
impl_params_for_tuple!(A a, B b, C c, D d, E e, F f, G g);
impl_params_for_tuple!(A a, B b, C c, D d, E e, F f, G g, H h);
impl_params_for_tuple!(A a, B b, C c, D d, E e, F f, G g, H h, I i);
impl_params_for_tuple!(A a, B b, C c, D d, E e, F f, G g, H h, I i, J j);
impl_params_for_tuple!(A a, B b, C c, D d, E e, F f, G g, H h, I i, J j, K k);
impl_params_for_tuple!(A a, B b, C c, D d, E e, F f, G g, H h, I i, J j, K k, L l);
