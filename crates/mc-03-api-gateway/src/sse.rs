//! Server-Sent Event streams.
//!
//! Each stream is one bus subscription. The client's last-seen marker
//! (`Last-Event-ID` header, or `lastEventId` query parameter) is passed to
//! the bus as the replay point, so a reconnecting client gets every event it
//! missed before live delivery resumes.
//!
//! Every frame carries `id: <sequence>`, `event: <type>` and the JSON
//! payload as `data`.

use crate::domain::{ApiError, ApiResult, StreamTransport};
use crate::service::{shutdown_signal, AppState};
use axum::extract::{Path, RawQuery, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use shared_bus::{NotificationEvent, Topic};
use shared_types::Location;
use std::convert::Infallible;

pub const LAST_EVENT_ID_HEADER: &str = "last-event-id";
pub const LAST_EVENT_ID_PARAM: &str = "lastEventId";

/// Query parameters of the streaming endpoints. Keys may repeat.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StreamQuery {
    pub kinds: Vec<String>,
    pub origins: Vec<String>,
    pub channels: Vec<String>,
    pub contexts: Vec<String>,
    pub subjects: Vec<String>,
    pub last_event_id: Option<String>,
}

impl StreamQuery {
    pub fn parse(raw: Option<&str>) -> Self {
        let mut query = Self::default();
        let Some(raw) = raw else {
            return query;
        };
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "kind" => query.kinds.push(value.into_owned()),
                "origin" => query.origins.push(value.into_owned()),
                "channel" => query.channels.push(value.into_owned()),
                "context" => query.contexts.push(value.into_owned()),
                "subject" => query.subjects.push(value.into_owned()),
                LAST_EVENT_ID_PARAM => query.last_event_id = Some(value.into_owned()),
                _ => {}
            }
        }
        query
    }
}

/// The replay point, header first.
pub fn last_event_id(headers: &HeaderMap, query: &StreamQuery) -> ApiResult<Option<u64>> {
    let raw = match headers.get(LAST_EVENT_ID_HEADER) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| ApiError::invalid_params("Last-Event-ID is not text"))?
                .to_string(),
        ),
        None => query.last_event_id.clone(),
    };

    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ApiError::invalid_params(format!("last event id {value}"))),
    }
}

fn to_sse_event(event: &NotificationEvent) -> Event {
    Event::default()
        .id(event.sequence.to_string())
        .event(event.event_type.as_str())
        .data(event.payload.to_string())
}

fn location_topics(
    values: &[String],
    topic: fn(Location) -> Topic,
) -> ApiResult<Vec<Topic>> {
    values
        .iter()
        .map(|value| -> ApiResult<Topic> { Ok(topic(value.parse::<Location>()?)) })
        .collect()
}

/// Subscribe and wrap the subscription as an SSE response.
fn open_stream(
    state: &AppState,
    topics: Vec<Topic>,
    after: Option<u64>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    if topics.is_empty() {
        return Err(ApiError::invalid_params("no topics requested"));
    }
    let max = state.config.streams.max_topics_per_stream;
    if topics.len() > max {
        return Err(ApiError::limit_exceeded(format!(
            "{} topics requested (max: {max})",
            topics.len()
        )));
    }

    let guard = state.streams.open(
        StreamTransport::Sse,
        topics.iter().map(ToString::to_string).collect(),
    );
    let subscription = state.bus.subscribe(&topics, after);

    // The guard lives as long as the response body; dropping the body on
    // disconnect drops the subscription and the registry entry together.
    let stream = subscription
        .map(move |event| {
            let _ = &guard;
            Ok(to_sse_event(&event))
        })
        .take_until(shutdown_signal(state.shutdown.clone()));

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(state.config.streams.keep_alive)))
}

/// `GET /notify/:address`
///
/// UTXO, spent and jig events for the address, plus channel updates and
/// messages addressed to it.
pub async fn notify_address(
    State(state): State<AppState>,
    Path(address): Path<String>,
    RawQuery(raw): RawQuery,
    headers: HeaderMap,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let query = StreamQuery::parse(raw.as_deref());
    let after = last_event_id(&headers, &query)?;
    open_stream(&state, vec![Topic::address(address)], after)
}

/// `GET /notify/jigs?kind=..&origin=..`
pub async fn notify_jigs(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
    headers: HeaderMap,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let query = StreamQuery::parse(raw.as_deref());
    let after = last_event_id(&headers, &query)?;

    let mut topics: Vec<Topic> = query.kinds.iter().map(|kind| Topic::kind(kind.as_str())).collect();
    topics.extend(location_topics(&query.origins, |loc| Topic::origin(loc))?);
    open_stream(&state, topics, after)
}

/// `GET /notify/channels?channel=..`
pub async fn notify_channels(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
    headers: HeaderMap,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let query = StreamQuery::parse(raw.as_deref());
    let after = last_event_id(&headers, &query)?;
    let topics = location_topics(&query.channels, |loc| Topic::channel(loc))?;
    open_stream(&state, topics, after)
}

/// `GET /notify/messages?context=..&subject=..`
pub async fn notify_messages(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
    headers: HeaderMap,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let query = StreamQuery::parse(raw.as_deref());
    let after = last_event_id(&headers, &query)?;
    let topics = query
        .contexts
        .iter()
        .map(|context| Topic::context(context.as_str()))
        .chain(query.subjects.iter().map(|subject| Topic::subject(subject.as_str())))
        .collect();
    open_stream(&state, topics, after)
}
