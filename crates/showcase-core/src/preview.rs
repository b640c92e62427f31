//! The preview surface: renders the selected showcase behind a fault
//! boundary, inside a simulated viewport and optional device frame, with
//! local pan and zoom.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::error::Error as StdError;
use std::panic::{self, AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use serde_json::Value;
use tracing::{debug, error};

use crate::controls::ControlValues;
use crate::renderable::{ComponentLibrary, Props, Renderable, RenderedOutput};
use crate::showcase::Showcase;
use crate::theme::ResolvedTheme;

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 2.0;

// ---------------------------------------------------------------------------
// Viewport and frame
// ---------------------------------------------------------------------------

/// A simulated size class for the rendering surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Viewport {
    #[default]
    Unconstrained,
    Mobile,
    Tablet,
    Desktop,
}

impl Viewport {
    /// Maximum surface width in pixels.
    pub fn max_width(self) -> Option<u32> {
        match self {
            Viewport::Unconstrained => None,
            Viewport::Mobile => Some(375),
            Viewport::Tablet => Some(768),
            Viewport::Desktop => Some(1280),
        }
    }
}

/// Decorative chrome drawn around the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceFrame {
    Phone,
    Tablet,
    Browser,
}

/// Frame insets in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameChrome {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
    pub corner_radius: u32,
}

impl DeviceFrame {
    pub fn chrome(self) -> FrameChrome {
        let (top, right, bottom, left, corner_radius) = match self {
            DeviceFrame::Phone => (44, 12, 34, 12, 36),
            DeviceFrame::Tablet => (24, 16, 24, 16, 20),
            DeviceFrame::Browser => (40, 1, 1, 1, 8),
        };
        FrameChrome {
            top,
            right,
            bottom,
            left,
            corner_radius,
        }
    }
}

// ---------------------------------------------------------------------------
// Pan / zoom
// ---------------------------------------------------------------------------

/// Local view state; never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub zoom: f32,
    pub pan_x: f32,
    pub pan_y: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewCommand {
    Pan { dx: f32, dy: f32 },
    /// Add `delta` to the zoom factor.
    Zoom(f32),
    SetZoom(f32),
    ResetView,
}

impl ViewTransform {
    pub fn apply(&mut self, command: ViewCommand) {
        match command {
            ViewCommand::Pan { dx, dy } => {
                self.pan_x += dx;
                self.pan_y += dy;
            }
            ViewCommand::Zoom(delta) => self.zoom = clamp_zoom(self.zoom + delta),
            ViewCommand::SetZoom(zoom) => self.zoom = clamp_zoom(zoom),
            ViewCommand::ResetView => *self = Self::default(),
        }
    }
}

fn clamp_zoom(zoom: f32) -> f32 {
    if zoom.is_nan() {
        return 1.0;
    }
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Geometry a host needs to lay the preview out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewLayout {
    pub viewport: Viewport,
    /// Maximum width of the rendering surface.
    pub surface_width: Option<u32>,
    pub frame: Option<DeviceFrame>,
    pub chrome: Option<FrameChrome>,
    /// Surface width plus horizontal chrome.
    pub framed_width: Option<u32>,
    pub view: ViewTransform,
}

// ---------------------------------------------------------------------------
// Render state
// ---------------------------------------------------------------------------

/// A caught rendering failure.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFailure {
    pub showcase_id: String,
    pub message: String,
    pub trace: String,
    /// 1 for the first attempt, incremented by every retry.
    pub attempt: u32,
}

/// A successful render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPreview {
    pub showcase_id: String,
    pub output: RenderedOutput,
    /// Stylesheet the host should attach around the output.
    pub global_styles: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum PreviewStatus {
    #[default]
    Idle,
    Rendered(RenderedPreview),
    Failed {
        failure: RenderFailure,
        /// The failure surface was closed by the user.
        dismissed: bool,
    },
}

/// The preview renderer.
#[derive(Default)]
pub struct Preview {
    viewport: Viewport,
    frame: Option<DeviceFrame>,
    view: ViewTransform,
    global_styles: Option<PathBuf>,
    wrapper: Option<Arc<dyn Renderable>>,
    current: Option<Arc<Showcase>>,
    attempt: u32,
    status: PreviewStatus,
}

impl std::fmt::Debug for Preview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preview")
            .field("viewport", &self.viewport)
            .field("frame", &self.frame)
            .field("view", &self.view)
            .field("global_styles", &self.global_styles)
            .field("wrapper", &self.wrapper.is_some())
            .field("current", &self.current.as_ref().map(|s| &s.id))
            .field("status", &self.status)
            .finish()
    }
}

impl Preview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_global_styles(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_styles = Some(path.into());
        self
    }

    /// Wrap every render in `wrapper`, which receives the rendered markup as
    /// `children` and the applied theme as `theme`.
    pub fn with_wrapper(mut self, wrapper: impl Renderable + 'static) -> Self {
        self.wrapper = Some(Arc::new(wrapper));
        self
    }

    /// Replace the wrapper, or remove it with `None`. Takes effect on the
    /// next render.
    pub fn set_wrapper(&mut self, wrapper: Option<Arc<dyn Renderable>>) {
        self.wrapper = wrapper;
    }

    pub fn has_wrapper(&self) -> bool {
        self.wrapper.is_some()
    }

    pub fn global_styles(&self) -> Option<&Path> {
        self.global_styles.as_deref()
    }

    pub fn status(&self) -> &PreviewStatus {
        &self.status
    }

    /// The showcase most recently rendered or attempted.
    pub fn current(&self) -> Option<&Arc<Showcase>> {
        self.current.as_ref()
    }

    /// The failure, unless there is none or it was dismissed.
    pub fn visible_failure(&self) -> Option<&RenderFailure> {
        match &self.status {
            PreviewStatus::Failed {
                failure,
                dismissed: false,
            } => Some(failure),
            _ => None,
        }
    }

    /// Render `showcase` with `values`. A failure never escapes; it becomes
    /// the preview status.
    pub fn render(
        &mut self,
        library: &ComponentLibrary,
        showcase: &Arc<Showcase>,
        values: &ControlValues,
        theme: ResolvedTheme,
    ) -> &PreviewStatus {
        self.current = Some(Arc::clone(showcase));
        self.attempt = 1;
        self.run(library, values, theme)
    }

    /// Clear the failure and render the same showcase again.
    pub fn retry(
        &mut self,
        library: &ComponentLibrary,
        values: &ControlValues,
        theme: ResolvedTheme,
    ) -> &PreviewStatus {
        if self.current.is_some() {
            self.attempt += 1;
            self.run(library, values, theme);
        }
        &self.status
    }

    /// Hide the failure surface; the failure itself is kept.
    pub fn dismiss(&mut self) {
        if let PreviewStatus::Failed { dismissed, .. } = &mut self.status {
            *dismissed = true;
        }
    }

    /// Forget the current showcase.
    pub fn clear(&mut self) {
        self.current = None;
        self.attempt = 0;
        self.status = PreviewStatus::Idle;
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn set_device_frame(&mut self, frame: Option<DeviceFrame>) {
        self.frame = frame;
    }

    pub fn apply(&mut self, command: ViewCommand) {
        self.view.apply(command);
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    pub fn layout(&self) -> PreviewLayout {
        let surface_width = self.viewport.max_width();
        let chrome = self.frame.map(DeviceFrame::chrome);
        let framed_width = match (surface_width, chrome) {
            (Some(width), Some(c)) => Some(width + c.left + c.right),
            (width, None) => width,
            (None, Some(_)) => None,
        };
        PreviewLayout {
            viewport: self.viewport,
            surface_width,
            frame: self.frame,
            chrome,
            framed_width,
            view: self.view,
        }
    }

    fn run(&mut self, library: &ComponentLibrary, values: &ControlValues, theme: ResolvedTheme) -> &PreviewStatus {
        let Some(showcase) = self.current.clone() else {
            return &self.status;
        };

        let props = build_props(&showcase, values);
        let result = match library.get(&showcase.renderable.component) {
            Some(component) => render_isolated(component.as_ref(), &props),
            None => Err(Caught {
                message: format!("unknown component `{}`", showcase.renderable.component),
                trace: format!("showcase {} ({})", showcase.id, showcase.source.display()),
            }),
        };
        let result = match (&self.wrapper, result) {
            (Some(wrapper), Ok(output)) => {
                let mut wrapper_props = Props::new();
                wrapper_props.insert("children".into(), Value::String(output.markup));
                wrapper_props.insert("theme".into(), Value::String(theme.as_str().into()));
                render_isolated(wrapper.as_ref(), &wrapper_props)
            }
            (_, result) => result,
        };

        self.status = match result {
            Ok(output) => {
                debug!(id = %showcase.id, "rendered showcase");
                PreviewStatus::Rendered(RenderedPreview {
                    showcase_id: showcase.id.clone(),
                    output,
                    global_styles: self.global_styles.clone(),
                })
            }
            Err(caught) => {
                error!(
                    id = %showcase.id,
                    attempt = self.attempt,
                    message = %caught.message,
                    "showcase failed to render"
                );
                PreviewStatus::Failed {
                    failure: RenderFailure {
                        showcase_id: showcase.id.clone(),
                        message: caught.message,
                        trace: caught.trace,
                        attempt: self.attempt,
                    },
                    dismissed: false,
                }
            }
        };
        &self.status
    }
}

/// The showcase's fixed args overlaid with the current control values.
pub fn build_props(showcase: &Showcase, values: &ControlValues) -> Props {
    let mut props = showcase.renderable.args.clone();
    for (key, value) in values.iter() {
        props.insert(key.clone(), value.clone());
    }
    props
}

struct Caught {
    message: String,
    trace: String,
}

thread_local! {
    static CAPTURING: Cell<bool> = const { Cell::new(false) };
    static PANIC_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static TRACE_HOOK: Once = Once::new();

/// Chain a panic hook that records where a panic inside the fault boundary
/// happened. Panics elsewhere only reach the previous hook.
fn install_trace_hook() {
    TRACE_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CAPTURING.with(Cell::get) {
                let location = info
                    .location()
                    .map_or_else(|| "unknown location".to_string(), ToString::to_string);
                let trace = format!("panicked at {location}\n{}", Backtrace::force_capture());
                PANIC_TRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            }
            previous(info);
        }));
    });
}

fn render_isolated(component: &dyn Renderable, props: &Props) -> Result<RenderedOutput, Caught> {
    install_trace_hook();
    PANIC_TRACE.with(|slot| slot.borrow_mut().take());
    let was_capturing = CAPTURING.with(|c| c.replace(true));
    let result = catch_unwind(AssertUnwindSafe(|| component.render(props)));
    CAPTURING.with(|c| c.set(was_capturing));

    match result {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(Caught {
            message: e.to_string(),
            trace: source_chain(&e),
        }),
        Err(payload) => Err(Caught {
            message: panic_message(payload.as_ref()),
            trace: PANIC_TRACE
                .with(|slot| slot.borrow_mut().take())
                .unwrap_or_else(|| "no trace recorded: the panic hook was replaced".to_string()),
        }),
    }
}

fn source_chain(error: &(dyn StdError + 'static)) -> String {
    let mut lines = vec![error.to_string()];
    let mut next = error.source();
    while let Some(cause) = next {
        lines.push(format!("caused by: {cause}"));
        next = cause.source();
    }
    lines.join("\n")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "component panicked".to_string()
    }
}
