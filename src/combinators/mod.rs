// Copyright 2025 ringcore contributors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Future combinators (spec.md §4.6): `wait_for`, `first_of`, `for_each`.

mod first_of;
mod for_each;
mod wait_all;

pub use first_of::{first_of, first_of2, Either};
pub use for_each::{for_each, ForCtl};
pub use wait_all::{wait_all, wait_two};
