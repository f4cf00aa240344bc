//! WebSocket-based live reload.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Messages buffered per browser before it starts lagging.
const CHANNEL_CAPACITY: usize = 100;

/// Path of the WebSocket endpoint the client connects to.
pub const LIVE_RELOAD_SOCKET: &str = "/__livereload";

/// Messages sent to browsers after a rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Full page reload
    Reload,

    /// Swap a stylesheet in place without reloading
    Css {
        /// URL path of the rebuilt stylesheet
        path: String,
    },

    /// Connection established
    Connected,
}

/// Hub for broadcasting reload messages to all connected browsers.
#[derive(Debug, Clone)]
pub struct LiveReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl LiveReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Send a message to all connected browsers.
    pub fn send(&self, msg: ReloadMessage) {
        // No receivers just means no browser is open.
        let _ = self.sender.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LiveReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for the next message for one browser.
///
/// A receiver that fell behind has missed updates it can no longer see, so
/// it gets a full reload instead. Returns `None` once the hub is gone.
pub async fn next_message(rx: &mut broadcast::Receiver<ReloadMessage>) -> Option<ReloadMessage> {
    match rx.recv().await {
        Ok(msg) => Some(msg),
        Err(broadcast::error::RecvError::Lagged(skipped)) => {
            tracing::debug!("Live reload client lagged by {} messages", skipped);
            Some(ReloadMessage::Reload)
        }
        Err(broadcast::error::RecvError::Closed) => None,
    }
}

/// Generate the browser-side live reload script.
///
/// The socket URL is derived from the page's own host, so the script works on
/// whatever address the server was bound to.
pub fn live_reload_client_script() -> String {
    format!(
        r#"
(function() {{
  'use strict';

  const url = (location.protocol === 'https:' ? 'wss://' : 'ws://') + location.host + '{socket}';
  const ws = new WebSocket(url);
  let reconnectAttempts = 0;
  const maxReconnectAttempts = 10;

  ws.onopen = function() {{
    console.log('[sitepipe] Connected');
    reconnectAttempts = 0;
  }};

  ws.onmessage = function(event) {{
    const msg = JSON.parse(event.data);

    switch (msg.type) {{
      case 'reload':
        location.reload();
        break;

      case 'css':
        let swapped = false;
        document.querySelectorAll('link[rel="stylesheet"]').forEach(function(link) {{
          const href = link.getAttribute('href') || '';
          if (href.split('?')[0].endsWith(msg.path)) {{
            link.setAttribute('href', href.split('?')[0] + '?t=' + Date.now());
            swapped = true;
          }}
        }});
        if (!swapped) {{
          location.reload();
        }}
        break;

      case 'connected':
        break;
    }}
  }};

  ws.onclose = function() {{
    console.log('[sitepipe] Disconnected');
    if (reconnectAttempts < maxReconnectAttempts) {{
      reconnectAttempts++;
      setTimeout(function() {{
        location.reload();
      }}, 1000 * reconnectAttempts);
    }}
  }};
}})();
"#,
        socket = LIVE_RELOAD_SOCKET
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lagging_client_gets_a_reload_and_keeps_listening() {
        let hub = LiveReloadHub::new();
        let mut rx = hub.subscribe();

        for i in 0..CHANNEL_CAPACITY + 5 {
            hub.send(ReloadMessage::Css {
                path: format!("/css/{i}.css"),
            });
        }

        assert_eq!(next_message(&mut rx).await, Some(ReloadMessage::Reload));
        assert_eq!(
            next_message(&mut rx).await,
            Some(ReloadMessage::Css {
                path: "/css/5.css".to_string()
            })
        );
    }

    #[tokio::test]
    async fn closed_hub_ends_the_stream() {
        let hub = LiveReloadHub::new();
        let mut rx = hub.subscribe();
        hub.send(ReloadMessage::Reload);
        drop(hub);

        assert_eq!(next_message(&mut rx).await, Some(ReloadMessage::Reload));
        assert_eq!(next_message(&mut rx).await, None);
    }

    #[test]
    fn hub_broadcasts_messages() {
        let hub = LiveReloadHub::new();
        let mut rx = hub.subscribe();

        hub.send(ReloadMessage::Reload);

        match rx.try_recv() {
            Ok(ReloadMessage::Reload) => {}
            other => panic!("Expected Reload message, got {:?}", other),
        }
    }

    #[test]
    fn sending_without_subscribers_is_harmless() {
        let hub = LiveReloadHub::new();

        hub.send(ReloadMessage::Reload);

        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn serializes_messages() {
        let msg = ReloadMessage::Css {
            path: "/css/main.css".to_string(),
        };

        let json = serde_json::to_string(&msg).unwrap();

        assert_eq!(json, r#"{"type":"css","path":"/css/main.css"}"#);
        assert_eq!(
            serde_json::to_string(&ReloadMessage::Reload).unwrap(),
            r#"{"type":"reload"}"#
        );
    }

    #[test]
    fn client_connects_to_socket_path() {
        let script = live_reload_client_script();

        assert!(script.contains("'/__livereload'"));
        assert!(script.contains("location.reload()"));
    }
}
