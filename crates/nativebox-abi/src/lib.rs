// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// nativebox-abi: fixed-layout blocks shared with the native dialog library,
// the allocator pair handed across the boundary, request-scoped memory and
// the model <-> block marshaller.

pub mod alloc;
pub mod marshal;
pub mod schema;
pub mod scope;

pub use alloc::{Allocator, TrackingAllocator};
pub use marshal::{RequestBlock, build_request, new_result_block, parse_result};
pub use schema::ABI_VERSION;
pub use scope::MemoryScope;
