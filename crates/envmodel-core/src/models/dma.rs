// DMA mapping model
//
// Every mapping must be checked with `dma_mapping_error` before the next one
// is made, and before the module unloads. Unchecked mappings keep counting,
// so each of them still needs its own check.

use crate::cell::ResourceClass;
use crate::env::Environment;

pub const DMA_MAPPING: ResourceClass = ResourceClass::counting("linux:arch:dma-mapping", 1);

/// Bus address handed back by a mapping
pub type DmaAddr = u64;

fn map(env: &mut Environment<'_>) -> DmaAddr {
    env.acquire_unconditionally(&DMA_MAPPING, None);
    env.arbitrary_ulong()
}

/// `dma_map_page`
pub fn map_page(env: &mut Environment<'_>) -> DmaAddr {
    map(env)
}

/// `dma_map_single`
pub fn map_single(env: &mut Environment<'_>) -> DmaAddr {
    map(env)
}

/// `dma_map_single_attrs`
pub fn map_single_attrs(env: &mut Environment<'_>) -> DmaAddr {
    map(env)
}

/// `dma_mapping_error`: consumes the pending check. Nonzero means the
/// mapping failed.
pub fn mapping_error(env: &mut Environment<'_>, _addr: DmaAddr) -> i64 {
    env.release(&DMA_MAPPING, None);
    env.arbitrary_int()
}
