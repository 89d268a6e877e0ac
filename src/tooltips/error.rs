use thiserror::Error;

/// Failures surfaced while creating tooltips for graph elements.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TooltipError {
	/// The document could not be reached or refused a DOM operation.
	#[error("DOM error: {0}")]
	Dom(String),
	/// The tooltip factory rejected a creation request.
	#[error("Tooltip factory error: {0}")]
	Factory(String),
}

impl TooltipError {
	pub(crate) fn dom(value: wasm_bindgen::JsValue) -> Self {
		Self::Dom(
			value
				.as_string()
				.unwrap_or_else(|| format!("{value:?}")),
		)
	}
}
