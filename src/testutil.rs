use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::Value as JsonValue;

use crate::errors::Result;
use crate::req::Transport;

/// Transport that replays scripted payloads and records every request, for
/// driving the dialect clients without a live server.
///
/// Scripted payloads are what a real transport would return after envelope
/// validation, so scripts carry the full `{"code", "data", ...}` shape.
#[derive(Debug)]
pub(crate) struct MockTransport {
    responses: Mutex<VecDeque<Result<JsonValue>>>,
    posts: Mutex<Vec<(JsonValue, Option<String>)>>,
    gets: Mutex<Vec<Option<String>>>,
}

impl MockTransport {
    pub fn new(responses: impl IntoIterator<Item = Result<JsonValue>>) -> Self {
        MockTransport {
            responses: Mutex::new(responses.into_iter().collect()),
            posts: Mutex::new(Vec::new()),
            gets: Mutex::new(Vec::new()),
        }
    }

    fn next_response(&self) -> Result<JsonValue> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("client issued more requests than were scripted")
    }

    /// Recorded POST bodies and URL overrides, in request order.
    pub fn posts(&self) -> Vec<(JsonValue, Option<String>)> {
        self.posts.lock().unwrap().clone()
    }

    /// Recorded GET URL overrides, in request order.
    pub fn gets(&self) -> Vec<Option<String>> {
        self.gets.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    async fn post(&self, body: &JsonValue, url: Option<&str>) -> Result<JsonValue> {
        self.posts
            .lock()
            .unwrap()
            .push((body.clone(), url.map(str::to_string)));
        self.next_response()
    }

    async fn get(&self, url: Option<&str>) -> Result<JsonValue> {
        self.gets.lock().unwrap().push(url.map(str::to_string));
        self.next_response()
    }
}
