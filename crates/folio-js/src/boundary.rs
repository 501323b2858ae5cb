//! Recovery view shown in place of the editor after an unhandled fault.
//!
//! Each mounted editor installs a `FaultBoundary` on its container. Faults
//! reach it either directly (a mount that could not complete) or through the
//! panic hook, which reports to every live boundary.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use folio_browser::folio_core::fault::{FAULT_BODY, FAULT_TITLE, RELOAD_LABEL, RETRY_LABEL};
use folio_browser::{FaultReport, FaultState, RecoveryAction};
use gloo_events::EventListener;
use wasm_bindgen::JsValue;
use web_sys::{Document, Element};

use crate::log_buffer::recent_logs;

const VIEW_CLASS: &str = "folio-fault";
const VIEW_STYLE: &str = "position:absolute;inset:0;z-index:10;overflow:auto;padding:24px;\
background:#fff;color:#222;font-family:system-ui,sans-serif;";

thread_local! {
    static BOUNDARIES: RefCell<Vec<Weak<FaultBoundary>>> = const { RefCell::new(Vec::new()) };
}

type RetryFn = Rc<dyn Fn()>;

pub struct FaultBoundary {
    container: Element,
    state: RefCell<FaultState>,
    view: RefCell<Option<FaultView>>,
    retry: RefCell<Option<RetryFn>>,
}

struct FaultView {
    root: Element,
    _listeners: Vec<EventListener>,
}

impl FaultBoundary {
    /// Guard `container` and register for panic reports.
    pub fn install(container: Element) -> Rc<Self> {
        let boundary = Rc::new(Self {
            container,
            state: RefCell::new(FaultState::default()),
            view: RefCell::new(None),
            retry: RefCell::new(None),
        });
        BOUNDARIES.with(|list| {
            let mut list = list.borrow_mut();
            list.retain(|weak| weak.strong_count() > 0);
            list.push(Rc::downgrade(&boundary));
        });
        boundary
    }

    /// What "Try Again" runs after the view is cleared.
    pub fn set_retry(&self, retry: RetryFn) {
        *self.retry.borrow_mut() = Some(retry);
    }

    pub fn is_faulted(&self) -> bool {
        self.state
            .try_borrow()
            .map(|state| state.is_faulted())
            .unwrap_or(true)
    }

    /// Record `report` and show the recovery view. Only the first fault shows.
    pub fn fault(self: &Rc<Self>, report: FaultReport) {
        let report = report.with_logs(recent_logs());
        let Ok(mut state) = self.state.try_borrow_mut() else {
            return;
        };
        if !state.record(report.clone()) {
            return;
        }
        drop(state);

        match self.render(&report) {
            Ok(view) => {
                if let Ok(mut slot) = self.view.try_borrow_mut() {
                    *slot = Some(view);
                }
            }
            Err(e) => tracing::error!("recovery view failed to render: {:?}", e),
        }
    }

    fn render(self: &Rc<Self>, report: &FaultReport) -> Result<FaultView, JsValue> {
        let document = self
            .container
            .owner_document()
            .ok_or_else(|| JsValue::from_str("container is detached"))?;

        let root = document.create_element("div")?;
        root.set_class_name(VIEW_CLASS);
        root.set_attribute("role", "alert")?;
        root.set_attribute("style", VIEW_STYLE)?;

        append_text(&document, &root, "h2", FAULT_TITLE)?;
        append_text(&document, &root, "p", FAULT_BODY)?;

        let details = document.create_element("details")?;
        append_text(&document, &details, "summary", "Error details")?;
        append_text(&document, &details, "pre", &report.details())?;
        root.append_child(&details)?;

        let retry = append_text(&document, &root, "button", RETRY_LABEL)?;
        let reload = append_text(&document, &root, "button", RELOAD_LABEL)?;
        let listeners = vec![
            self.on_click(&retry, RecoveryAction::Retry),
            self.on_click(&reload, RecoveryAction::Reload),
        ];

        self.container.append_child(&root)?;
        Ok(FaultView {
            root,
            _listeners: listeners,
        })
    }

    fn on_click(self: &Rc<Self>, button: &Element, action: RecoveryAction) -> EventListener {
        let weak = Rc::downgrade(self);
        EventListener::new(button, "click", move |_| {
            let weak = weak.clone();
            // The view owns this listener; tear it down outside the handler.
            wasm_bindgen_futures::spawn_local(async move {
                if let Some(boundary) = weak.upgrade() {
                    boundary.recover(action);
                }
            });
        })
    }

    fn recover(&self, action: RecoveryAction) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.recover(action);
        }
        if let Some(view) = self.view.borrow_mut().take() {
            view.root.remove();
        }

        match action {
            RecoveryAction::Retry => {
                let retry = self.retry.borrow().clone();
                if let Some(retry) = retry {
                    retry();
                }
            }
            RecoveryAction::Reload => {
                let reloaded = web_sys::window()
                    .ok_or_else(|| JsValue::from_str("no window"))
                    .and_then(|w| w.location().reload());
                if let Err(e) = reloaded {
                    tracing::error!("page reload failed: {:?}", e);
                }
            }
        }
    }

    /// Remove the view and stop receiving panic reports.
    pub fn uninstall(self: &Rc<Self>) {
        if let Ok(mut view) = self.view.try_borrow_mut() {
            if let Some(view) = view.take() {
                view.root.remove();
            }
        }
        BOUNDARIES.with(|list| {
            if let Ok(mut list) = list.try_borrow_mut() {
                list.retain(|weak| !std::ptr::eq(weak.as_ptr(), Rc::as_ptr(self)));
            }
        });
    }
}

fn append_text(
    document: &Document,
    parent: &Element,
    tag: &str,
    text: &str,
) -> Result<Element, JsValue> {
    let element = document.create_element(tag)?;
    element.set_text_content(Some(text));
    parent.append_child(&element)?;
    Ok(element)
}

/// Panic hook: log, then show the recovery view on every mounted editor.
pub fn report_panic(info: &std::panic::PanicHookInfo<'_>) {
    let payload = info.payload();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic".to_string());
    let mut report = FaultReport::new(message);
    if let Some(location) = info.location() {
        report = report.with_location(location.to_string());
    }

    let boundaries: Vec<Rc<FaultBoundary>> = BOUNDARIES.with(|list| {
        list.try_borrow()
            .map(|list| list.iter().filter_map(Weak::upgrade).collect())
            .unwrap_or_default()
    });
    for boundary in boundaries {
        boundary.fault(report.clone());
    }
}
