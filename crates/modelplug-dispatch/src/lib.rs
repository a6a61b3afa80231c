// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider/model factory dispatch.
//!
//! A [`FactoryDispatcher`] maps a provider namespace to the
//! [`ProviderFactory`] that can build adapters for it and keeps built
//! adapters in an [`AdapterCache`] until they are evicted.

pub mod cache;
pub mod dispatcher;
pub mod factory;
pub mod stream;

pub use cache::{AdapterCache, AdapterKey};
pub use dispatcher::FactoryDispatcher;
pub use factory::ProviderFactory;
pub use stream::stream_with_cancellation;
