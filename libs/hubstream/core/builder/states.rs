/// Type-state markers for the builder pattern
///
/// These types track which required fields have been set, so a client
/// without an address or subscriber id does not compile.

use std::marker::PhantomData;

/// Marker trait for address state
pub trait AddressState {}

/// Hub address has not been set
pub struct NoAddress;
impl AddressState for NoAddress {}

/// Hub address has been set
pub struct HasAddress;
impl AddressState for HasAddress {}

/// Marker trait for identity state
pub trait IdentityState {}

/// Subscriber id has not been set
pub struct NoIdentity;
impl IdentityState for NoIdentity {}

/// Subscriber id has been set
pub struct HasIdentity;
impl IdentityState for HasIdentity {}

/// Phantom marker to prevent direct construction
#[derive(Debug, Clone, Copy)]
pub struct TypeState<A, I> {
    _address: PhantomData<A>,
    _identity: PhantomData<I>,
}

impl<A, I> TypeState<A, I> {
    pub(crate) fn new() -> Self {
        Self {
            _address: PhantomData,
            _identity: PhantomData,
        }
    }
}

impl<A, I> Default for TypeState<A, I> {
    fn default() -> Self {
        Self::new()
    }
}
