// self
use crate::{_prelude::*, activity::ActivityError, obs::FlowKind};

/// Future type returned by [`FlowSpan::instrument`]; instrumented only with `tracing`.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Future type returned by [`FlowSpan::instrument`]; instrumented only with `tracing`.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Span wrapper shared by handshake steps and transports.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Opens an `oauth1_broker.flow` span tagged with `kind` and `stage`.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("oauth1_broker.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Enters the span for a synchronous section.
	pub fn entered(self) -> FlowSpanGuard {
		#[cfg(feature = "tracing")]
		{
			FlowSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			FlowSpanGuard {}
		}
	}

	/// Attaches the span to a future run by a transport task.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`FlowSpan::entered`].
pub struct FlowSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for FlowSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("FlowSpanGuard(..)")
	}
}

/// Reports an activity-counter violation that has no caller to surface it to.
pub fn log_unbalanced_activity(kind: FlowKind, error: &ActivityError) {
	#[cfg(feature = "tracing")]
	{
		tracing::error!(flow = kind.as_str(), %error, "network activity counter is unbalanced");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, error);
	}
}

/// Reports a redirect that arrived while no authorization was waiting for it.
pub fn log_dropped_redirect(url: &Url) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			flow = FlowKind::Authorize.as_str(),
			url = %url,
			"redirect dropped because no authorization is pending"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = url;
	}
}
