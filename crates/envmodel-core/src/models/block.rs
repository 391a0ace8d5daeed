// Block layer request model
//
// At most one request may be held at a time; it must be put before exit.

use crate::cell::ResourceClass;
use crate::env::Environment;
use crate::oracle::{Pointer, ENOMEM};
use crate::transition::AcquirePolicy;
use crate::Step;

pub const BLK_REQUEST: ResourceClass = ResourceClass::exclusive("linux:block:request");

/// Allocation flags passed to request allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Gfp(pub u32);

impl Gfp {
    pub const ATOMIC: Gfp = Gfp(0x20);
    pub const WAIT: Gfp = Gfp(0x10);
    pub const IO: Gfp = Gfp(0x40);
    pub const FS: Gfp = Gfp(0x80);
    pub const NOIO: Gfp = Gfp(Self::WAIT.0);
    pub const KERNEL: Gfp = Gfp(Self::WAIT.0 | Self::IO.0 | Self::FS.0);

    /// Masks that allow sleeping cannot fail to get a request.
    pub fn policy(&self) -> AcquirePolicy {
        if *self == Gfp::WAIT || *self == Gfp::KERNEL || *self == Gfp::NOIO {
            AcquirePolicy::NeverFails
        } else {
            AcquirePolicy::MayFail
        }
    }
}

/// `blk_get_request`: a request, or null on failure.
pub fn get_request(env: &mut Environment<'_>, mask: Gfp) -> Step<Pointer> {
    let handle = env.acquire(&BLK_REQUEST, None, mask.policy())?;
    Ok(handle.map_or(Pointer::Null, |handle| handle.pointer()))
}

/// `blk_make_request`: a request, or an error pointer on failure.
pub fn make_request(env: &mut Environment<'_>, _mask: Gfp) -> Step<Pointer> {
    let handle = env.acquire(&BLK_REQUEST, None, AcquirePolicy::ErrorPointer)?;
    Ok(handle.map_or(Pointer::err(ENOMEM), |handle| handle.pointer()))
}

/// `blk_put_request`
pub fn put_request(env: &mut Environment<'_>, _request: Pointer) -> bool {
    env.release(&BLK_REQUEST, None)
}
