use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{Document, HtmlElement};

use super::collab::{
	Placement, PopperRef, ReferenceRect, TooltipFactory, TooltipHandle, TooltipOptions,
};
use super::error::TooltipError;

/// Gap between the popup and its reference, in CSS pixels.
const OFFSET: f64 = 10.0;

const BASE_STYLE: &str = "position: fixed; \
	display: none; \
	background-color: rgba(45, 55, 72, 0.95); \
	color: white; \
	border: 1px solid #4a5568; \
	border-radius: 6px; \
	padding: 6px 10px; \
	font: 500 12px sans-serif; \
	white-space: nowrap; \
	pointer-events: none; \
	z-index: 1000;";

/// Creates tooltips as `div.graph-tooltip` popups appended to the body.
pub struct DomTooltipFactory {
	document: Document,
}

impl DomTooltipFactory {
	/// Factory for the current window's document.
	pub fn new() -> Result<Self, TooltipError> {
		let document = web_sys::window()
			.and_then(|window| window.document())
			.ok_or_else(|| TooltipError::Dom("no document available".into()))?;
		Ok(Self { document })
	}
}

impl TooltipFactory for DomTooltipFactory {
	type Handle = DomTooltip;

	fn create(&self, reference: PopperRef, options: TooltipOptions) -> Result<DomTooltip, TooltipError> {
		let popup: HtmlElement = self
			.document
			.create_element("div")
			.map_err(TooltipError::dom)?
			.dyn_into()
			.map_err(|_| TooltipError::Dom("tooltip popup is not an HTML element".into()))?;
		popup.set_class_name("graph-tooltip");
		popup
			.set_attribute("style", BASE_STYLE)
			.map_err(TooltipError::dom)?;

		let body = self
			.document
			.body()
			.ok_or_else(|| TooltipError::Dom("document has no body".into()))?;
		body.append_child(&popup).map_err(TooltipError::dom)?;

		Ok(DomTooltip {
			placer: Rc::new(Placer {
				popup,
				reference,
				placement: options.placement,
			}),
			content: options.content,
			visible: Cell::new(false),
			follow: Rc::new(RefCell::new(None)),
			frame: Rc::new(Cell::new(None)),
		})
	}
}

/// Positions a popup against its reference.
struct Placer {
	popup: HtmlElement,
	reference: PopperRef,
	placement: Placement,
}

impl Placer {
	fn place(&self) {
		let (x, y, transform) = anchor(&(self.reference)(), self.placement);
		let style = self.popup.style();
		let _ = style.set_property("left", &format!("{x}px"));
		let _ = style.set_property("top", &format!("{y}px"));
		let _ = style.set_property("transform", transform);
	}
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

fn request_frame(callback: &FrameCallback) -> Option<i32> {
	let window = web_sys::window()?;
	let callback = callback.borrow();
	window
		.request_animation_frame(callback.as_ref()?.as_ref().unchecked_ref())
		.ok()
}

/// Popup created by [`DomTooltipFactory`].
///
/// Text is read once per `show`. The position is refreshed on every
/// animation frame while the popup is visible, so it follows a moving or
/// dragged element.
pub struct DomTooltip {
	placer: Rc<Placer>,
	content: Rc<dyn Fn() -> String>,
	visible: Cell<bool>,
	follow: FrameCallback,
	frame: Rc<Cell<Option<i32>>>,
}

impl DomTooltip {
	fn start_following(&self) {
		if self.frame.get().is_some() {
			return;
		}
		if self.follow.borrow().is_none() {
			let (placer, frame, follow) =
				(self.placer.clone(), self.frame.clone(), self.follow.clone());
			*self.follow.borrow_mut() = Some(Closure::new(move || {
				placer.place();
				frame.set(request_frame(&follow));
			}));
		}
		self.frame.set(request_frame(&self.follow));
	}

	fn stop_following(&self) {
		if let (Some(id), Some(window)) = (self.frame.take(), web_sys::window()) {
			let _ = window.cancel_animation_frame(id);
		}
	}
}

impl TooltipHandle for DomTooltip {
	fn show(&self) {
		let text = (self.content)();
		self.placer.popup.set_text_content(Some(text.as_str()));
		self.placer.place();
		let _ = self.placer.popup.style().set_property("display", "block");
		self.visible.set(true);
		self.start_following();
	}

	fn hide(&self) {
		if !self.visible.replace(false) {
			return;
		}
		self.stop_following();
		let _ = self.placer.popup.style().set_property("display", "none");
	}

	fn is_visible(&self) -> bool {
		self.visible.get()
	}
}

impl Drop for DomTooltip {
	fn drop(&mut self) {
		self.stop_following();
		// The frame callback holds its own cell; clearing it frees both.
		self.follow.borrow_mut().take();
		self.placer.popup.remove();
	}
}

/// Anchor point and CSS transform that put the popup on the requested side
/// of `rect`.
fn anchor(rect: &ReferenceRect, placement: Placement) -> (f64, f64, &'static str) {
	match placement {
		Placement::Top => (rect.center_x(), rect.top - OFFSET, "translate(-50%, -100%)"),
		Placement::Bottom => (
			rect.center_x(),
			rect.top + rect.height + OFFSET,
			"translate(-50%, 0)",
		),
		Placement::Left => (rect.left - OFFSET, rect.center_y(), "translate(-100%, -50%)"),
		Placement::Right => (
			rect.left + rect.width + OFFSET,
			rect.center_y(),
			"translate(0, -50%)",
		),
	}
}
