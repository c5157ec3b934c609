use std::sync::Arc;

use dashmap::DashMap;

use crate::ping::Status;
use crate::proxy::Player;

/// Decides what to tell a player who reached a login prompt on a handled
/// hostname. The returned string is sent as the disconnect message.
pub trait Handler: Send + Sync {
    fn login_message(&self, player: &Player) -> String;
}

impl<F> Handler for F
where
    F: Fn(&Player) -> String + Send + Sync,
{
    fn login_message(&self, player: &Player) -> String {
        self(player)
    }
}

/// Hostname-keyed bindings consulted by every connection: statuses for the
/// server list, handlers for local logins, forwarders for transparent
/// proxying. Handlers and forwarders are mutually exclusive per hostname;
/// statuses are independent. Keys are lowercased on insert and lookup, and
/// the maps are safe to rebind while serving.
#[derive(Default)]
pub struct Router {
    statuses: DashMap<String, Status>,
    handlers: DashMap<String, Arc<dyn Handler>>,
    forwarders: DashMap<String, String>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server-list status displayed for the given hostnames.
    pub fn set_status(&self, hostnames: &[&str], status: Status) {
        for hostname in hostnames {
            self.statuses
                .insert(hostname.to_ascii_lowercase(), status.clone());
        }
    }

    /// Clears the server-list status for the given hostnames.
    pub fn clear_status(&self, hostnames: &[&str]) {
        for hostname in hostnames {
            self.statuses.remove(&hostname.to_ascii_lowercase());
        }
    }

    /// Installs a login handler for the given hostnames, unbinding any
    /// forwarder they had.
    pub fn handle<H>(&self, hostnames: &[&str], handler: H)
    where
        H: Handler + 'static,
    {
        let handler: Arc<dyn Handler> = Arc::new(handler);
        for hostname in hostnames {
            let hostname = hostname.to_ascii_lowercase();
            self.forwarders.remove(&hostname);
            self.handlers.insert(hostname, handler.clone());
        }
    }

    /// Forwards connections for the given hostnames to an upstream address,
    /// unbinding any handler they had. The address must include a port.
    /// Statuses are left in place; rebinding a handler later brings any
    /// stored status back into use.
    pub fn forward(&self, hostnames: &[&str], address: &str) {
        for hostname in hostnames {
            let hostname = hostname.to_ascii_lowercase();
            self.handlers.remove(&hostname);
            self.forwarders.insert(hostname, address.to_string());
        }
    }

    /// Removes both the handler and the forwarder for the given hostnames,
    /// leaving statuses untouched.
    pub fn clear_handlers(&self, hostnames: &[&str]) {
        for hostname in hostnames {
            let hostname = hostname.to_ascii_lowercase();
            self.handlers.remove(&hostname);
            self.forwarders.remove(&hostname);
        }
    }

    pub fn status(&self, hostname: &str) -> Option<Status> {
        self.statuses
            .get(&hostname.to_ascii_lowercase())
            .map(|entry| entry.value().clone())
    }

    pub fn handler(&self, hostname: &str) -> Option<Arc<dyn Handler>> {
        self.handlers
            .get(&hostname.to_ascii_lowercase())
            .map(|entry| entry.value().clone())
    }

    pub fn forward_target(&self, hostname: &str) -> Option<String> {
        self.forwarders
            .get(&hostname.to_ascii_lowercase())
            .map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn greeter(player: &Player) -> String {
        format!("Hello {}", player.username)
    }

    #[test]
    fn forward_then_handle_leaves_only_the_handler() {
        let router = Router::new();
        router.forward(&["play.example"], "upstream:25565");
        router.handle(&["play.example"], greeter);

        assert!(router.forward_target("play.example").is_none());
        assert!(router.handler("play.example").is_some());
    }

    #[test]
    fn handle_then_forward_leaves_only_the_forwarder() {
        let router = Router::new();
        router.handle(&["play.example"], greeter);
        router.forward(&["play.example"], "upstream:25565");

        assert!(router.handler("play.example").is_none());
        assert_eq!(
            router.forward_target("play.example").as_deref(),
            Some("upstream:25565")
        );
    }

    #[test]
    fn clear_handlers_removes_both_but_keeps_the_status() {
        let router = Router::new();
        router.set_status(
            &["play.example"],
            Status {
                max_players: 20,
                ..Default::default()
            },
        );
        router.handle(&["play.example"], greeter);
        router.clear_handlers(&["play.example"]);

        assert!(router.handler("play.example").is_none());
        assert!(router.forward_target("play.example").is_none());
        assert_eq!(router.status("play.example").unwrap().max_players, 20);

        router.clear_status(&["play.example"]);
        assert!(router.status("play.example").is_none());
    }

    #[test]
    fn hostnames_are_case_insensitive() {
        let router = Router::new();
        router.forward(&["Play.Example.COM"], "upstream:25565");
        assert!(router.forward_target("play.example.com").is_some());
        assert!(router.forward_target("PLAY.EXAMPLE.COM").is_some());
    }

    #[test]
    fn one_binding_covers_every_listed_hostname() {
        let router = Router::new();
        router.forward(&["a.example", "b.example"], "upstream:25565");
        assert!(router.forward_target("a.example").is_some());
        assert!(router.forward_target("b.example").is_some());
        assert!(router.forward_target("c.example").is_none());
    }

    #[test]
    fn handler_sees_the_player() {
        let router = Router::new();
        router.handle(&["play.example"], greeter);

        let mut player = Player::new("127.0.0.1".into());
        player.username = "Alice".into();
        let handler = router.handler("play.example").unwrap();
        assert_eq!(handler.login_message(&player), "Hello Alice");
    }
}
