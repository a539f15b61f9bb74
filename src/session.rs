//! Session Registry
//!
//! Process-lifetime state per identity that is never persisted: last
//! activity and AFK status, command/chat cooldowns, toggles such as god
//! mode, last known location. Cleared on restart by definition.
//!
//! Touched from both the tick context and the chat context, so every
//! operation runs under one lock.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Transient state for one identity
#[derive(Debug, Clone)]
pub struct Session {
    pub last_activity: Instant,
    pub afk: bool,
    pub location: Option<String>,
    /// Action → end of its cooldown; `None` never ends
    cooldowns: HashMap<String, Option<Instant>>,
    flags: HashSet<String>,
}

impl Session {
    fn new(now: Instant) -> Self {
        Self {
            last_activity: now,
            afk: false,
            location: None,
            cooldowns: HashMap::new(),
            flags: HashSet::new(),
        }
    }
}

/// Registry of live sessions keyed by identity
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Activity / AFK
    // =========================================================================

    /// Record activity now; returns true if the identity was AFK
    pub fn touch(&self, identity: &str) -> bool {
        self.touch_at(identity, Instant::now())
    }

    pub fn touch_at(&self, identity: &str, now: Instant) -> bool {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .entry(identity.to_string())
            .or_insert_with(|| Session::new(now));
        session.last_activity = now;
        std::mem::replace(&mut session.afk, false)
    }

    /// Set the AFK flag explicitly (e.g. an /afk command)
    pub fn set_afk(&self, identity: &str, afk: bool) {
        let now = Instant::now();
        let mut sessions = self.sessions.lock();
        sessions
            .entry(identity.to_string())
            .or_insert_with(|| Session::new(now))
            .afk = afk;
    }

    pub fn is_afk(&self, identity: &str) -> bool {
        self.sessions
            .lock()
            .get(identity)
            .map(|s| s.afk)
            .unwrap_or(false)
    }

    /// Mark everyone idle for at least `threshold` as AFK
    ///
    /// Returns the identities that just became AFK, sorted.
    pub fn sweep_idle(&self, threshold: Duration) -> Vec<String> {
        self.sweep_idle_at(threshold, Instant::now())
    }

    pub fn sweep_idle_at(&self, threshold: Duration, now: Instant) -> Vec<String> {
        let mut sessions = self.sessions.lock();
        let mut newly_afk: Vec<String> = sessions
            .iter_mut()
            .filter(|(_, s)| !s.afk && now.saturating_duration_since(s.last_activity) >= threshold)
            .map(|(id, s)| {
                s.afk = true;
                id.clone()
            })
            .collect();
        newly_afk.sort();
        newly_afk
    }

    // =========================================================================
    // Cooldowns
    // =========================================================================

    /// Start `action`'s cooldown unless it is still running
    ///
    /// Returns `Err(remaining)` while cooling down; the running cooldown is
    /// not extended. A cooldown too long to represent never ends and
    /// reports `Duration::MAX` remaining.
    pub fn try_cooldown(
        &self,
        identity: &str,
        action: &str,
        cooldown: Duration,
    ) -> Result<(), Duration> {
        self.try_cooldown_at(identity, action, cooldown, Instant::now())
    }

    pub fn try_cooldown_at(
        &self,
        identity: &str,
        action: &str,
        cooldown: Duration,
        now: Instant,
    ) -> Result<(), Duration> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .entry(identity.to_string())
            .or_insert_with(|| Session::new(now));

        match session.cooldowns.get(action) {
            Some(None) => return Err(Duration::MAX),
            Some(&Some(ready_at)) if now < ready_at => return Err(ready_at - now),
            _ => {}
        }
        session
            .cooldowns
            .insert(action.to_string(), now.checked_add(cooldown));
        Ok(())
    }

    // =========================================================================
    // Flags
    // =========================================================================

    pub fn set_flag(&self, identity: &str, flag: &str, on: bool) {
        let now = Instant::now();
        let mut sessions = self.sessions.lock();
        let session = sessions
            .entry(identity.to_string())
            .or_insert_with(|| Session::new(now));
        if on {
            session.flags.insert(flag.to_string());
        } else {
            session.flags.remove(flag);
        }
    }

    /// Flip `flag`; returns the new state
    pub fn toggle_flag(&self, identity: &str, flag: &str) -> bool {
        let now = Instant::now();
        let mut sessions = self.sessions.lock();
        let session = sessions
            .entry(identity.to_string())
            .or_insert_with(|| Session::new(now));
        if session.flags.remove(flag) {
            false
        } else {
            session.flags.insert(flag.to_string());
            true
        }
    }

    pub fn has_flag(&self, identity: &str, flag: &str) -> bool {
        self.sessions
            .lock()
            .get(identity)
            .map(|s| s.flags.contains(flag))
            .unwrap_or(false)
    }

    // =========================================================================
    // Location
    // =========================================================================

    pub fn set_location(&self, identity: &str, location: impl Into<String>) {
        let now = Instant::now();
        let mut sessions = self.sessions.lock();
        sessions
            .entry(identity.to_string())
            .or_insert_with(|| Session::new(now))
            .location = Some(location.into());
    }

    pub fn location(&self, identity: &str) -> Option<String> {
        self.sessions
            .lock()
            .get(identity)
            .and_then(|s| s.location.clone())
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Copy of one session
    pub fn get(&self, identity: &str) -> Option<Session> {
        self.sessions.lock().get(identity).cloned()
    }

    /// Drop a session (identity left); returns whether one existed
    pub fn remove(&self, identity: &str) -> bool {
        self.sessions.lock().remove(identity).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}
