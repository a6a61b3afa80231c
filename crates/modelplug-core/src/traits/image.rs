// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Image generation adapter trait.

use async_trait::async_trait;

use crate::error::RuntimeError;
use crate::traits::adapter::ModelAdapter;
use crate::types::{ImageRequest, ImageResponse};

#[async_trait]
pub trait ImageAdapter: ModelAdapter {
    async fn generate(&self, request: ImageRequest) -> Result<ImageResponse, RuntimeError>;
}
