//! # sizedalloc-region
//!
//! Backing region allocators and the sized allocator adapters layered on
//! them.
//!
//! A backing ([`RegionAllocator`]) only knows how to hand out, resize and
//! release blocks. An adapter ([`SizedAllocator`]) adds what the consumer's
//! memory table also needs: the size of any live block, a round-up hint and
//! init/shutdown hooks.
//!
//! | adapter            | backing needs            | pointer handed out    |
//! |--------------------|--------------------------|-----------------------|
//! | [`HeaderTracked`]  | nothing extra            | block + prefix        |
//! | [`PassThrough`]    | [`AllocatorSizeQuery`]   | backing's own pointer |
//! | [`PoolScoped`]     | [`PoolSizeQuery`]        | backing's own pointer |

pub mod adapter;
pub mod backing;
pub mod libc_region;
pub mod platform;
pub mod tracked;

pub use adapter::{HeaderTracked, PassThrough, PoolScoped, SizedAllocator};
pub use backing::{AllocatorSizeQuery, PoolSizeQuery, RegionAllocator};
pub use libc_region::LibcRegion;
pub use tracked::{PoolId, RegionStats, TrackedRegion};
