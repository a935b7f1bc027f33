// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tower layer that runs every request through the [`RequestGate`].
//!
//! ```ignore
//! Router::new()
//!     .route("/health", get(health_check))
//!     .layer(SealGateLayer::new(gate));
//! ```

use std::{
	future::Future,
	pin::Pin,
	task::{Context, Poll},
};

use axum::{
	body::Body,
	http::{Request, StatusCode},
	response::{IntoResponse, Response},
	Json,
};
use pin_project_lite::pin_project;
use tower::{Layer, Service};
use warden_server_unseal::{GateRejection, RequestGate};

use crate::error::ErrorResponse;

/// Operation name the gate sees for a request path.
///
/// `/api/unseal` and `/api/login` map to `unseal` and `login`; every other
/// path is its own operation name.
pub fn operation_for_path(path: &str) -> &str {
	match path.trim_end_matches('/') {
		"/api/unseal" => "unseal",
		"/api/login" => "login",
		_ => path,
	}
}

#[derive(Clone)]
pub struct SealGateLayer {
	gate: RequestGate,
}

impl SealGateLayer {
	pub fn new(gate: RequestGate) -> Self {
		Self { gate }
	}
}

impl<S> Layer<S> for SealGateLayer {
	type Service = SealGateService<S>;

	fn layer(&self, inner: S) -> Self::Service {
		SealGateService {
			inner,
			gate: self.gate.clone(),
		}
	}
}

/// Service wrapper for [`SealGateLayer`].
#[derive(Clone)]
pub struct SealGateService<S> {
	inner: S,
	gate: RequestGate,
}

impl<S> Service<Request<Body>> for SealGateService<S>
where
	S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
	S::Future: Send,
{
	type Response = Response;
	type Error = S::Error;
	type Future = SealGateFuture<S::Future>;

	fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		self.inner.poll_ready(cx)
	}

	fn call(&mut self, req: Request<Body>) -> Self::Future {
		let operation = operation_for_path(req.uri().path());

		if let Err(rejection) = self.gate.check(operation) {
			tracing::info!(
				operation,
				check = rejection.check,
				"request rejected by gate"
			);
			return SealGateFuture::Rejected {
				resp: Some(rejection_response(rejection)),
			};
		}

		SealGateFuture::Inner {
			fut: self.inner.call(req),
		}
	}
}

fn rejection_response(rejection: GateRejection) -> Response {
	let status =
		StatusCode::from_u16(rejection.status_code).unwrap_or(StatusCode::SERVICE_UNAVAILABLE);
	(
		status,
		Json(ErrorResponse::new(rejection.code, rejection.message)),
	)
		.into_response()
}

pin_project! {
	/// Future for [`SealGateService`].
	#[project = SealGateFutureProj]
	pub enum SealGateFuture<F> {
		Inner { #[pin] fut: F },
		Rejected { resp: Option<Response> },
	}
}

impl<F, E> Future for SealGateFuture<F>
where
	F: Future<Output = Result<Response, E>>,
{
	type Output = Result<Response, E>;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match self.project() {
			SealGateFutureProj::Inner { fut } => fut.poll(cx),
			SealGateFutureProj::Rejected { resp } => {
				Poll::Ready(Ok(resp.take().expect("polled after completion")))
			}
		}
	}
}
