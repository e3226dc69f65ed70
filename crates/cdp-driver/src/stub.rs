//! Scripted in-memory driver for tests
//!
//! Models a tiny site as a set of pages with named elements, scripted click
//! effects (navigate / reveal / hide) and injectable transient failures.
//! Every trait call is appended to a log so tests can assert ordering
//! properties (e.g. that no call attributable to a later step happened after
//! an earlier step failed).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::driver::PageDriver;
use crate::errors::DriverError;
use crate::types::{ElementHandle, ElementHit, ElementState, Selector};

/// One driver call, as recorded in the stub's log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Navigate(String),
    Query(Selector),
    ElementState(ElementHandle),
    Click(ElementHandle),
    Fill { handle: ElementHandle, text: String },
    Text(ElementHandle),
    Value(ElementHandle),
    CurrentUrl,
    Title,
    Screenshot,
    GoBack,
}

/// What a scripted click does to the page model.
#[derive(Debug, Clone, Default)]
pub struct ClickEffect {
    /// Navigate to this URL (invalidates all handles).
    pub navigate_to: Option<String>,

    /// Make these elements (by name, on the current page) visible.
    pub reveal: Vec<String>,

    /// Make these elements invisible.
    pub hide: Vec<String>,
}

impl ClickEffect {
    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            navigate_to: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn reveal(name: impl Into<String>) -> Self {
        Self {
            reveal: vec![name.into()],
            ..Default::default()
        }
    }

    pub fn hide(name: impl Into<String>) -> Self {
        Self {
            hide: vec![name.into()],
            ..Default::default()
        }
    }

    pub fn and_reveal(mut self, name: impl Into<String>) -> Self {
        self.reveal.push(name.into());
        self
    }
}

/// A scripted element on a stub page.
#[derive(Debug, Clone)]
pub struct StubElement {
    name: String,
    selectors: Vec<Selector>,
    text: String,
    value: String,
    visible: bool,
    enabled: bool,
    /// Element only enters the DOM after this much wall time.
    appears_after: Option<Duration>,
    on_click: Option<ClickEffect>,
    /// Injected transient failures: the next N clicks report a stale handle.
    fail_clicks: u32,
}

impl StubElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selectors: Vec::new(),
            text: String::new(),
            value: String::new(),
            visible: true,
            enabled: true,
            appears_after: None,
            on_click: None,
            fail_clicks: 0,
        }
    }

    pub fn matched_by(mut self, selector: Selector) -> Self {
        self.selectors.push(selector);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn appears_after(mut self, delay: Duration) -> Self {
        self.appears_after = Some(delay);
        self
    }

    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.on_click = Some(effect);
        self
    }

    pub fn failing_clicks(mut self, count: u32) -> Self {
        self.fail_clicks = count;
        self
    }
}

/// A scripted page.
#[derive(Debug, Clone)]
pub struct StubPage {
    url: String,
    title: String,
    elements: Vec<StubElement>,
}

impl StubPage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            elements: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_element(mut self, element: StubElement) -> Self {
        self.elements.push(element);
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct HandleEntry {
    page_index: usize,
    element_index: usize,
    generation: u64,
}

struct StubState {
    pages: Vec<StubPage>,
    current: usize,
    history: Vec<usize>,
    generation: u64,
    handles: HashMap<u64, HandleEntry>,
    next_handle: u64,
    calls: Vec<DriverCall>,
    crashed: bool,
}

/// Deterministic scripted driver.
pub struct StubDriver {
    state: Mutex<StubState>,
    started: Instant,
}

impl StubDriver {
    /// Build a driver whose session starts on the first added page.
    pub fn new(pages: Vec<StubPage>) -> Self {
        assert!(!pages.is_empty(), "stub driver needs at least one page");
        Self {
            state: Mutex::new(StubState {
                pages,
                current: 0,
                history: Vec::new(),
                generation: 0,
                handles: HashMap::new(),
                next_handle: 0,
                calls: Vec::new(),
                crashed: false,
            }),
            started: Instant::now(),
        }
    }

    /// Snapshot of every call made so far, in order.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls touching a given selector.
    pub fn queries_for(&self, selector: &Selector) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| matches!(call, DriverCall::Query(s) if s == selector))
            .count()
    }

    /// Simulate the page crashing; every later call fails fatally.
    pub fn crash(&self) {
        self.state.lock().unwrap().crashed = true;
    }

    fn check_alive(state: &StubState) -> Result<(), DriverError> {
        if state.crashed {
            Err(DriverError::PageGone("stub page crashed".to_string()))
        } else {
            Ok(())
        }
    }

    fn element_available(&self, element: &StubElement) -> bool {
        match element.appears_after {
            Some(delay) => self.started.elapsed() >= delay,
            None => true,
        }
    }

    fn resolve_handle(
        state: &StubState,
        handle: ElementHandle,
    ) -> Result<HandleEntry, DriverError> {
        let entry = state
            .handles
            .get(&handle.0)
            .copied()
            .ok_or(DriverError::StaleElement)?;
        if entry.generation != state.generation || entry.page_index != state.current {
            return Err(DriverError::StaleElement);
        }
        Ok(entry)
    }

    fn find_page(state: &StubState, url: &str) -> Option<usize> {
        state.pages.iter().position(|p| p.url == url)
    }
}

#[async_trait]
impl PageDriver for StubDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DriverCall::Navigate(url.to_string()));
        Self::check_alive(&state)?;
        match Self::find_page(&state, url) {
            Some(index) => {
                let previous = state.current;
                state.history.push(previous);
                state.current = index;
                state.generation += 1;
                Ok(())
            }
            None => Err(DriverError::Navigation(format!("no stub page for {url}"))),
        }
    }

    async fn query(&self, selector: &Selector) -> Result<Vec<ElementHit>, DriverError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DriverCall::Query(selector.clone()));
        Self::check_alive(&state)?;

        let page_index = state.current;
        let generation = state.generation;
        let matches: Vec<(usize, ElementState)> = state.pages[page_index]
            .elements
            .iter()
            .enumerate()
            .filter(|(_, el)| self.element_available(el) && el.selectors.contains(selector))
            .map(|(index, el)| {
                (
                    index,
                    ElementState {
                        visible: el.visible,
                        enabled: el.enabled,
                    },
                )
            })
            .collect();

        let mut hits = Vec::with_capacity(matches.len());
        for (element_index, element_state) in matches {
            let id = state.next_handle;
            state.next_handle += 1;
            state.handles.insert(
                id,
                HandleEntry {
                    page_index,
                    element_index,
                    generation,
                },
            );
            hits.push(ElementHit {
                handle: ElementHandle(id),
                state: element_state,
            });
        }
        Ok(hits)
    }

    async fn element_state(&self, handle: ElementHandle) -> Result<ElementState, DriverError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DriverCall::ElementState(handle));
        Self::check_alive(&state)?;
        let entry = Self::resolve_handle(&state, handle)?;
        let element = &state.pages[entry.page_index].elements[entry.element_index];
        Ok(ElementState {
            visible: element.visible,
            enabled: element.enabled,
        })
    }

    async fn click(&self, handle: ElementHandle) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DriverCall::Click(handle));
        Self::check_alive(&state)?;
        let entry = Self::resolve_handle(&state, handle)?;

        let page_index = entry.page_index;
        let element_index = entry.element_index;
        {
            let element = &mut state.pages[page_index].elements[element_index];
            if element.fail_clicks > 0 {
                element.fail_clicks -= 1;
                return Err(DriverError::StaleElement);
            }
            if !element.visible || !element.enabled {
                return Err(DriverError::NotInteractable(element.name.clone()));
            }
        }

        let effect = state.pages[page_index].elements[element_index]
            .on_click
            .clone();
        if let Some(effect) = effect {
            for name in &effect.reveal {
                if let Some(el) = state.pages[page_index]
                    .elements
                    .iter_mut()
                    .find(|el| &el.name == name)
                {
                    el.visible = true;
                    el.appears_after = None;
                }
            }
            for name in &effect.hide {
                if let Some(el) = state.pages[page_index]
                    .elements
                    .iter_mut()
                    .find(|el| &el.name == name)
                {
                    el.visible = false;
                }
            }
            if let Some(url) = &effect.navigate_to {
                match Self::find_page(&state, url) {
                    Some(index) => {
                        state.history.push(page_index);
                        state.current = index;
                        state.generation += 1;
                    }
                    None => {
                        return Err(DriverError::Navigation(format!("no stub page for {url}")))
                    }
                }
            }
        }
        Ok(())
    }

    async fn fill(&self, handle: ElementHandle, text: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DriverCall::Fill {
            handle,
            text: text.to_string(),
        });
        Self::check_alive(&state)?;
        let entry = Self::resolve_handle(&state, handle)?;
        let element = &mut state.pages[entry.page_index].elements[entry.element_index];
        if !element.visible || !element.enabled {
            return Err(DriverError::NotInteractable(element.name.clone()));
        }
        // Overwrite, never append: the fill contract is clear-then-type.
        element.value = text.to_string();
        Ok(())
    }

    async fn text(&self, handle: ElementHandle) -> Result<String, DriverError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DriverCall::Text(handle));
        Self::check_alive(&state)?;
        let entry = Self::resolve_handle(&state, handle)?;
        Ok(state.pages[entry.page_index].elements[entry.element_index]
            .text
            .clone())
    }

    async fn value(&self, handle: ElementHandle) -> Result<String, DriverError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DriverCall::Value(handle));
        Self::check_alive(&state)?;
        let entry = Self::resolve_handle(&state, handle)?;
        Ok(state.pages[entry.page_index].elements[entry.element_index]
            .value
            .clone())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DriverCall::CurrentUrl);
        Self::check_alive(&state)?;
        let index = state.current;
        Ok(state.pages[index].url.clone())
    }

    async fn title(&self) -> Result<String, DriverError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DriverCall::Title);
        Self::check_alive(&state)?;
        let index = state.current;
        Ok(state.pages[index].title.clone())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DriverCall::Screenshot);
        Self::check_alive(&state)?;
        Ok(b"stub-screenshot".to_vec())
    }

    async fn go_back(&self) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(DriverCall::GoBack);
        Self::check_alive(&state)?;
        if let Some(previous) = state.history.pop() {
            state.current = previous;
            state.generation += 1;
        }
        Ok(())
    }
}
