//! Navigable viewer over the recorded requests of an entry's runs.
//!
//! A viewer only opens after the first request of the run is found. Each
//! navigation bumps a generation; content fetched for an older generation
//! is dropped on arrival, so the last navigation always wins.
//!
//! Nothing here waits on the network while navigating. Request counts,
//! request content and neighbouring requests are fetched by the caller and
//! handed back through [`RunViewerController::resume_step`],
//! [`RunViewerController::apply`] and [`RunViewerController::store_prefetched`].

use std::collections::HashMap;
use std::num::NonZeroUsize;

use benchboard_protocol::{
    BoardError, RequestMetadata, RunLocator, FIRST_REQUEST_INDEX, GAMESTATE_FILE,
    MAX_REQUESTS_PER_RUN, MEMORY_FILE, METADATA_FILE, REASONING_FILE, REQUEST_CACHE_CAPACITY,
    SCREENSHOT_FORMATS, STRATEGY_FILE, TOOL_CALL_FILE, UNKNOWN_SEED,
};
use futures_util::future::join_all;
use lru::LruCache;
use serde_json::Value;

use crate::fetcher::{fetch_json, fetch_text, probe, DataFetcher};

/// What a per-run row click asks the viewer to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub locator: RunLocator,
    /// Every run of the entry, in table order.
    pub runs: Vec<String>,
    pub run_index: usize,
    pub start_index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub run_index: usize,
    /// 1-based.
    pub request_index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Identifies the navigation a load belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavTicket {
    pub generation: u64,
    pub position: Position,
    pub run_id: String,
    /// Content was served from the session cache; no load is needed.
    pub prefilled: bool,
}

impl NavTicket {
    pub fn needs_load(&self) -> bool {
        !self.prefilled
    }
}

/// Result of a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Moved(NavTicket),
    /// The target depends on a run's request count that is not known yet.
    /// Count with [`discover_total`] and hand the result to
    /// [`RunViewerController::resume_step`].
    NeedsTotal(TotalRequest),
}

/// A request count to discover for the open session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalRequest {
    pub session: u64,
    /// Navigation generation when the count was asked for.
    pub generation: u64,
    pub run_id: String,
    /// The step waiting on this count, if any.
    pub pending: Option<Direction>,
}

/// A neighbouring request to load into the session cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchTicket {
    pub session: u64,
    pub run_id: String,
    pub request_index: u32,
}

/// Artifacts of one recorded request, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestBundle {
    pub reasoning: String,
    /// `name({args})` summary of the tool call.
    pub tool_call: String,
    pub strategy: String,
    pub gamestate: String,
    pub memory: String,
    pub metadata: Option<RequestMetadata>,
    /// Path of the first screenshot format found.
    pub screenshot: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestContent {
    Loading,
    Ready(Box<RequestBundle>),
    /// The addressed request has no recorded tool call.
    Unavailable { reason: String },
}

struct ViewerSession {
    id: u64,
    locator: RunLocator,
    runs: Vec<String>,
    position: Position,
    /// Discovered request count per run id.
    totals: HashMap<String, u32>,
    /// Last request shown per run index, restored on vertical moves.
    remembered: HashMap<usize, u32>,
    generation: u64,
    content: RequestContent,
    cache: LruCache<(String, u32), RequestBundle>,
}

enum Target {
    At(Position),
    /// Request count of this run is needed first.
    Count(String),
}

impl ViewerSession {
    fn run_id(&self, run_index: usize) -> Option<&str> {
        self.runs.get(run_index).map(String::as_str)
    }

    /// Where `dir` leads from the current position, using known counts only.
    fn target(&self, dir: Direction) -> Option<Target> {
        let current = self.position;
        let run_count = self.runs.len();
        let run_id = self.run_id(current.run_index)?;

        let position = match dir {
            Direction::Forward => match self.totals.get(run_id) {
                None => return Some(Target::Count(run_id.to_string())),
                Some(&total) if current.request_index < total => Position {
                    request_index: current.request_index + 1,
                    ..current
                },
                Some(_) => Position {
                    run_index: (current.run_index + 1) % run_count,
                    request_index: FIRST_REQUEST_INDEX,
                },
            },
            Direction::Backward if current.request_index > FIRST_REQUEST_INDEX => Position {
                request_index: current.request_index - 1,
                ..current
            },
            Direction::Backward => {
                let prev = (current.run_index + run_count - 1) % run_count;
                let prev_id = self.run_id(prev)?;
                match self.totals.get(prev_id) {
                    None => return Some(Target::Count(prev_id.to_string())),
                    Some(&last) => Position {
                        run_index: prev,
                        request_index: last,
                    },
                }
            }
        };
        Some(Target::At(position))
    }
}

#[derive(Default)]
pub struct RunViewerController {
    session: Option<ViewerSession>,
    next_generation: u64,
    sessions_opened: u64,
}

impl RunViewerController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Probe the run's first request and open on success. On failure the
    /// controller is left exactly as it was.
    pub async fn open(
        &mut self,
        fetcher: &dyn DataFetcher,
        request: OpenRequest,
    ) -> Result<NavTicket, BoardError> {
        let run_id = request
            .runs
            .get(request.run_index)
            .cloned()
            .ok_or_else(|| BoardError::ProbeNotFound {
                path: request.locator.base_path.clone(),
            })?;
        let marker = request.locator.marker_path(&run_id, FIRST_REQUEST_INDEX);
        if let Err(e) = probe(fetcher, &marker).await {
            tracing::info!(run_id = %run_id, path = %marker, "Run has no recorded requests; viewer not opened");
            return Err(e);
        }

        tracing::info!(run_id = %run_id, "Opening run viewer");
        self.sessions_opened += 1;
        let capacity = NonZeroUsize::new(REQUEST_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        self.session = Some(ViewerSession {
            id: self.sessions_opened,
            locator: request.locator,
            runs: request.runs,
            position: Position {
                run_index: request.run_index,
                request_index: FIRST_REQUEST_INDEX,
            },
            totals: HashMap::new(),
            remembered: HashMap::new(),
            generation: 0,
            content: RequestContent::Loading,
            cache: LruCache::new(capacity),
        });
        let start = Position {
            run_index: request.run_index,
            request_index: request.start_index.max(FIRST_REQUEST_INDEX),
        };
        self.move_to(start)
            .ok_or_else(|| BoardError::ProbeNotFound { path: marker })
    }

    /// Discard the session and everything it loaded.
    pub fn close(&mut self) {
        if self.session.take().is_some() {
            tracing::debug!("Closed run viewer");
        }
    }

    /// Move one request forward or backward. Past the last request of a
    /// run this wraps to the first request of the next run; before the
    /// first request it wraps to the last request of the previous run.
    ///
    /// Never fetches. When the move depends on a request count that is
    /// still unknown, the position stays put and the count is asked for.
    pub fn step(&mut self, dir: Direction) -> Option<StepOutcome> {
        let (session_id, generation, target) = {
            let session = self.session.as_ref()?;
            (session.id, session.generation, session.target(dir)?)
        };
        match target {
            Target::At(position) => self.move_to(position).map(StepOutcome::Moved),
            Target::Count(run_id) => {
                tracing::debug!(run_id = %run_id, ?dir, "Step waits on request count");
                Some(StepOutcome::NeedsTotal(TotalRequest {
                    session: session_id,
                    generation,
                    run_id,
                    pending: Some(dir),
                }))
            }
        }
    }

    /// Record a discovered count and finish the step waiting on it. A step
    /// is dropped when another navigation landed in the meantime.
    pub fn resume_step(&mut self, request: &TotalRequest, total: u32) -> Option<NavTicket> {
        let session = self.session.as_mut()?;
        if session.id != request.session {
            tracing::debug!(run_id = %request.run_id, "Dropping request count for a closed session");
            return None;
        }
        tracing::debug!(run_id = %request.run_id, total, "Discovered request count");
        session.totals.insert(request.run_id.clone(), total);

        let dir = request.pending?;
        if session.generation != request.generation {
            tracing::debug!(
                generation = request.generation,
                current = session.generation,
                "Dropping superseded step"
            );
            return None;
        }
        let target = session.target(dir)?;
        match target {
            Target::At(position) => self.move_to(position),
            Target::Count(_) => None,
        }
    }

    /// Count request for the shown run when it is still unknown.
    pub fn total_request(&self) -> Option<TotalRequest> {
        let session = self.session.as_ref()?;
        let run_id = session.run_id(session.position.run_index)?;
        if session.totals.contains_key(run_id) {
            return None;
        }
        Some(TotalRequest {
            session: session.id,
            generation: session.generation,
            run_id: run_id.to_string(),
            pending: None,
        })
    }

    /// Move to another run without wrapping, restoring the request last
    /// shown there. Returns `None` at either end.
    pub fn jump_run(&mut self, delta: isize) -> Option<NavTicket> {
        let session = self.session.as_ref()?;
        let target = session.position.run_index.checked_add_signed(delta)?;
        if target >= session.runs.len() {
            return None;
        }
        let request_index = session
            .remembered
            .get(&target)
            .copied()
            .unwrap_or(FIRST_REQUEST_INDEX);
        self.move_to(Position {
            run_index: target,
            request_index,
        })
    }

    fn move_to(&mut self, target: Position) -> Option<NavTicket> {
        self.next_generation += 1;
        let generation = self.next_generation;
        let session = self.session.as_mut()?;
        let run_id = session.run_id(target.run_index)?.to_string();

        if target.run_index != session.position.run_index {
            session
                .remembered
                .insert(session.position.run_index, session.position.request_index);
        }
        session.position = target;
        session.generation = generation;

        let cached = session
            .cache
            .get(&(run_id.clone(), target.request_index))
            .cloned();
        let prefilled = cached.is_some();
        session.content = match cached {
            Some(bundle) => RequestContent::Ready(Box::new(bundle)),
            None => RequestContent::Loading,
        };
        Some(NavTicket {
            generation,
            position: target,
            run_id,
            prefilled,
        })
    }

    /// Apply loaded content if `ticket` is still the latest navigation.
    pub fn apply(&mut self, ticket: &NavTicket, content: RequestContent) -> bool {
        let Some(session) = self.session.as_mut() else {
            tracing::debug!(generation = ticket.generation, "Viewer closed; dropping request content");
            return false;
        };
        if session.generation != ticket.generation {
            tracing::debug!(
                generation = ticket.generation,
                current = session.generation,
                "Dropping superseded request content"
            );
            return false;
        }
        if let RequestContent::Ready(bundle) = &content {
            session.cache.put(
                (ticket.run_id.clone(), ticket.position.request_index),
                (**bundle).clone(),
            );
        }
        session.content = content;
        true
    }

    /// Requests on either side of the shown one, within its run, that are
    /// not cached yet. Empty until the shown request is ready.
    pub fn prefetch_targets(&self) -> Vec<PrefetchTicket> {
        let Some(session) = self.session.as_ref() else {
            return Vec::new();
        };
        if !matches!(session.content, RequestContent::Ready(_)) {
            return Vec::new();
        }
        let Some(run_id) = session.run_id(session.position.run_index) else {
            return Vec::new();
        };
        let index = session.position.request_index;
        let total = session.totals.get(run_id).copied();
        let previous = index.checked_sub(1).filter(|i| *i >= FIRST_REQUEST_INDEX);
        let next = Some(index + 1).filter(|i| total.map_or(true, |t| *i <= t));

        [previous, next]
            .into_iter()
            .flatten()
            .filter(|i| !session.cache.contains(&(run_id.to_string(), *i)))
            .map(|request_index| PrefetchTicket {
                session: session.id,
                run_id: run_id.to_string(),
                request_index,
            })
            .collect()
    }

    /// Cache prefetched content. The shown request and the generation are
    /// left alone; anything but ready content is discarded.
    pub fn store_prefetched(&mut self, ticket: &PrefetchTicket, content: RequestContent) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.id != ticket.session {
            return false;
        }
        match content {
            RequestContent::Ready(bundle) => {
                session
                    .cache
                    .put((ticket.run_id.clone(), ticket.request_index), *bundle);
                true
            }
            _ => false,
        }
    }

    /// Step, discovering a missing request count inline.
    pub async fn step_now(&mut self, fetcher: &dyn DataFetcher, dir: Direction) -> Option<NavTicket> {
        match self.step(dir)? {
            StepOutcome::Moved(ticket) => Some(ticket),
            StepOutcome::NeedsTotal(request) => {
                let locator = self.locator()?.clone();
                let total = discover_total(fetcher, &locator, &request.run_id).await;
                self.resume_step(&request, total)
            }
        }
    }

    /// Step and load inline.
    pub async fn navigate(&mut self, fetcher: &dyn DataFetcher, dir: Direction) -> bool {
        let Some(ticket) = self.step_now(fetcher, dir).await else {
            return false;
        };
        self.load_for(fetcher, &ticket).await
    }

    /// Load the content a ticket addresses and apply it.
    pub async fn load_for(&mut self, fetcher: &dyn DataFetcher, ticket: &NavTicket) -> bool {
        if !ticket.needs_load() {
            return true;
        }
        let Some(locator) = self.locator().cloned() else {
            return false;
        };
        let content = load_request(fetcher, &locator, &ticket.run_id, ticket.position.request_index).await;
        self.apply(ticket, content)
    }

    /// Load the neighbours of the shown request into the cache.
    pub async fn prefetch_now(&mut self, fetcher: &dyn DataFetcher) -> usize {
        let Some(locator) = self.locator().cloned() else {
            return 0;
        };
        let targets = self.prefetch_targets();
        let loads = targets
            .iter()
            .map(|t| load_request(fetcher, &locator, &t.run_id, t.request_index));
        let contents = join_all(loads).await;
        let mut stored = 0;
        for (ticket, content) in targets.iter().zip(contents) {
            if self.store_prefetched(ticket, content) {
                stored += 1;
            }
        }
        stored
    }

    pub fn position(&self) -> Option<Position> {
        self.session.as_ref().map(|s| s.position)
    }

    pub fn content(&self) -> Option<&RequestContent> {
        self.session.as_ref().map(|s| &s.content)
    }

    pub fn locator(&self) -> Option<&RunLocator> {
        self.session.as_ref().map(|s| &s.locator)
    }

    pub fn run_id(&self) -> Option<&str> {
        let session = self.session.as_ref()?;
        session.run_id(session.position.run_index)
    }

    /// `vendor/model • seed • Run i/n • Request k/total`, plus token and
    /// cost figures when the request recorded metadata.
    pub fn title(&self) -> Option<String> {
        let session = self.session.as_ref()?;
        let run_id = session.run_id(session.position.run_index)?;
        let total = session
            .totals
            .get(run_id)
            .map_or_else(|| "?".to_string(), u32::to_string);
        let mut title = format!(
            "{}/{} • {} • Run {}/{} • Request {}/{}",
            session.locator.vendor,
            session.locator.model,
            seed_from_run_id(run_id),
            session.position.run_index + 1,
            session.runs.len(),
            session.position.request_index,
            total,
        );
        if let RequestContent::Ready(bundle) = &session.content {
            if let Some(meta) = &bundle.metadata {
                title.push_str(&format!(
                    " • in/out {}/{} • $ in/out {:.4}/{:.4}",
                    meta.tokens_in, meta.tokens_out, meta.cost_in, meta.cost_out
                ));
            }
        }
        Some(title)
    }
}

/// Seed is the last `_`-separated segment of a run id.
pub fn seed_from_run_id(run_id: &str) -> &str {
    match run_id.rsplit('_').next() {
        Some(seed) if !seed.is_empty() => seed,
        _ => UNKNOWN_SEED,
    }
}

/// Highest request index in `1..=MAX_REQUESTS_PER_RUN` whose marker exists,
/// by binary search. Defaults to 1.
pub async fn discover_total(fetcher: &dyn DataFetcher, locator: &RunLocator, run_id: &str) -> u32 {
    let (mut low, mut high) = (FIRST_REQUEST_INDEX, MAX_REQUESTS_PER_RUN);
    let mut found = FIRST_REQUEST_INDEX;
    while low <= high {
        let mid = low + (high - low) / 2;
        if probe(fetcher, &locator.marker_path(run_id, mid)).await.is_ok() {
            found = mid;
            low = mid + 1;
        } else {
            high = mid - 1;
        }
    }
    found
}

/// Fetch the artifact bundle of one request. Missing text artifacts become
/// placeholders; a missing tool call makes the request unavailable.
pub async fn load_request(
    fetcher: &dyn DataFetcher,
    locator: &RunLocator,
    run_id: &str,
    index: u32,
) -> RequestContent {
    let dir = locator.request_dir(run_id, index);
    let tool_call_path = format!("{dir}/{TOOL_CALL_FILE}");
    let reasoning_path = format!("{dir}/{REASONING_FILE}");
    let strategy_path = format!("{dir}/{STRATEGY_FILE}");
    let gamestate_path = format!("{dir}/{GAMESTATE_FILE}");
    let memory_path = format!("{dir}/{MEMORY_FILE}");
    let metadata_path = format!("{dir}/{METADATA_FILE}");
    let screenshots: Vec<String> = SCREENSHOT_FORMATS
        .iter()
        .map(|ext| format!("{dir}/screenshot.{ext}"))
        .collect();

    let (tool_call, reasoning, strategy, gamestate, memory, metadata, found) = futures_util::join!(
        fetch_json::<Value>(fetcher, &tool_call_path),
        fetch_text(fetcher, &reasoning_path),
        fetch_text(fetcher, &strategy_path),
        fetch_text(fetcher, &gamestate_path),
        fetch_text(fetcher, &memory_path),
        fetch_json::<RequestMetadata>(fetcher, &metadata_path),
        join_all(screenshots.iter().map(|p| fetcher.exists(p))),
    );

    let tool_call = match tool_call {
        Ok(value) => summarize_tool_call(&value),
        Err(e) => {
            tracing::debug!(path = %tool_call_path, error = %e, "Request unavailable");
            return RequestContent::Unavailable {
                reason: e.to_string(),
            };
        }
    };

    let text_or = |result: Result<String, BoardError>, file: &str| {
        result
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("(No {file})"))
    };
    let screenshot = screenshots
        .into_iter()
        .zip(found)
        .find(|(_, ok)| matches!(ok, Ok(true)))
        .map(|(path, _)| path);

    RequestContent::Ready(Box::new(RequestBundle {
        reasoning: text_or(reasoning, REASONING_FILE),
        tool_call,
        strategy: text_or(strategy, STRATEGY_FILE),
        gamestate: text_or(gamestate, GAMESTATE_FILE),
        memory: text_or(memory, MEMORY_FILE),
        metadata: metadata.ok(),
        screenshot,
    }))
}

/// `name({args})` with the `reasoning` argument dropped. Accepts a single
/// call or an array of calls (first wins); arguments may be a JSON string
/// or an object.
pub fn summarize_tool_call(value: &Value) -> String {
    let call = match value {
        Value::Array(calls) => calls.first(),
        other => Some(other),
    };
    let function = call.and_then(|c| c.get("function"));
    let name = function
        .and_then(|f| f.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("(unknown)");
    let mut args = match function.and_then(|f| f.get("arguments")) {
        Some(Value::String(raw)) => serde_json::from_str(raw).unwrap_or_else(|_| Value::Object(Default::default())),
        Some(obj @ Value::Object(_)) => obj.clone(),
        _ => Value::Object(Default::default()),
    };
    if let Value::Object(map) = &mut args {
        map.remove("reasoning");
    }
    format!("{name}({args})")
}
