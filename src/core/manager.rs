use crate::model::Request;
use crate::model::Session;
use crate::timer::Timer;
use crate::util::Util;

use winsys::connection::Connection;
use winsys::event::Event;
use winsys::input::EventKind;
use winsys::input::InputEvent;
use winsys::window::Window;
use winsys::Result;

use std::collections::VecDeque;
use std::time::Instant;

/// The last button press seen, as `(window, button, server time)`.
type Click = (Window, u32, u32);

/// Owns every screen session and pumps events into them until one of
/// them asks to restart or exit.
pub struct WindowManager<'a> {
    conn: &'a dyn Connection,
    sessions: Vec<Session<'a>>,
    timer: Timer,
    pending: VecDeque<Event>,
    last_click: Option<Click>,
}

impl<'a> WindowManager<'a> {
    pub fn new(
        conn: &'a dyn Connection,
        sessions: Vec<Session<'a>>,
    ) -> Self {
        Self {
            conn,
            sessions,
            timer: Timer::new(),
            pending: VecDeque::new(),
            last_click: None,
        }
    }

    /// Takes over every screen and adopts the windows already on it.
    pub fn init(&mut self) {
        for session in self.sessions.iter_mut() {
            session.init();
            session.scan();
        }

        self.conn.flush();
    }

    pub fn run(&mut self) -> Result<Request> {
        loop {
            Util::reap_children();

            for interrupt in self.timer.expired(Instant::now()) {
                let screen = interrupt.screen;

                match self.sessions.iter_mut().find(|session| session.index() == screen) {
                    Some(session) => session.fire(interrupt),
                    None => warn!("interrupt for unknown screen {}", screen),
                }
            }

            if Util::terminated() {
                info!("terminated by signal");
                self.teardown();
                return Ok(Request::Exit);
            }

            if let Some(request) = self.take_request() {
                info!("leaving event loop: {:?}", request);
                self.teardown();
                return Ok(request);
            }

            for session in self.sessions.iter_mut() {
                self.pending.extend(session.take_reinjected());
            }

            let event = match self.pending.pop_front() {
                Some(event) => Some(event),
                None => match self.conn.wait_event(self.timer.timeout(Instant::now())) {
                    Ok(event) => event,
                    Err(err) => return Err(err),
                },
            };

            if let Some(event) = event {
                let event = self.collapse_motion(event);
                trace!("received event: {:?}", event);

                if let Event::Input(input) = &event {
                    if let Some(double) = self.double_click(input) {
                        self.route(Event::Input(*input));
                        self.route(Event::Input(double));
                        self.conn.flush();
                        continue;
                    }
                }

                self.route(event);
            }

            self.conn.flush();
        }
    }

    /// Gives back every managed window on every screen.
    pub fn teardown(&mut self) {
        for session in self.sessions.iter_mut() {
            session.teardown();
        }

        self.conn.flush();
    }

    fn take_request(&mut self) -> Option<Request> {
        self.sessions
            .iter_mut()
            .find_map(|session| session.take_request())
    }

    /// Skips ahead to the newest queued motion on the same window.
    fn collapse_motion(
        &mut self,
        mut event: Event,
    ) -> Event {
        while let Event::Motion {
            window, ..
        } = event
        {
            match self.conn.poll_event() {
                Some(next @ Event::Motion { .. }) if next.window() == Some(window) => {
                    event = next;
                },
                Some(next) => {
                    self.pending.push_back(next);
                    break;
                },
                None => break,
            }
        }

        event
    }

    /// The synthetic double click completed by `input`, if any.
    fn double_click(
        &mut self,
        input: &InputEvent,
    ) -> Option<InputEvent> {
        if input.kind != EventKind::ButtonPress {
            return None;
        }

        let interval = self
            .session_for(input.root)
            .map(|session| self.sessions[session].double_click().as_millis() as u32)
            .unwrap_or(0);

        match self.last_click.take() {
            Some((window, button, time))
                if window == input.window
                    && button == input.detail
                    && input.time.wrapping_sub(time) <= interval =>
            {
                let mut double = *input;
                double.kind = EventKind::DoubleClick;
                Some(double)
            },
            _ => {
                self.last_click = Some((input.window, input.detail, input.time));
                None
            },
        }
    }

    fn session_for(
        &self,
        root: Window,
    ) -> Option<usize> {
        self.sessions
            .iter()
            .position(|session| session.root() == root)
    }

    fn owner_of(
        &self,
        window: Window,
    ) -> Option<usize> {
        self.sessions
            .iter()
            .position(|session| session.owns(window))
    }

    /// Hands `event` to the session of the screen it happened on.
    fn route(
        &mut self,
        event: Event,
    ) {
        let target = match &event {
            Event::Mapping => {
                for session in self.sessions.iter_mut() {
                    session.handle_event(Event::Mapping, &mut self.timer);
                }

                return;
            },
            Event::Input(input) => self
                .session_for(input.root)
                .or_else(|| self.owner_of(input.window)),
            Event::MapRequest {
                window,
                parent,
            } => self
                .session_for(*parent)
                .or_else(|| self.owner_of(*window)),
            Event::ConfigureRequest {
                window, ..
            } => self.owner_of(*window).or(Some(0)),
            event => event.window().and_then(|window| self.owner_of(window)),
        };

        match target {
            Some(index) if index < self.sessions.len() => {
                self.sessions[index].handle_event(event, &mut self.timer)
            },
            _ => trace!("dropping event for foreign window: {:?}", event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::mock::session;
    use crate::mock::MockConnection;
    use crate::mock::ROOT;

    use winsys::geometry::Pos;
    use winsys::geometry::Region;
    use winsys::input::ModMask;

    fn on_root(
        kind: EventKind,
        detail: u32,
        time: u32,
    ) -> Event {
        let mut input = InputEvent::new(kind, detail, ModMask::empty(), ROOT);
        input.root = ROOT;
        input.time = time;
        Event::Input(input)
    }

    #[test]
    fn exit_binding_ends_the_loop() {
        let conn = MockConnection::new();
        let session = session(&conn, "root { exit: Escape=KeyPress }");
        let mut manager = WindowManager::new(&conn, vec![session]);

        conn.push_event(on_root(EventKind::KeyPress, 9, 0));

        assert_eq!(manager.run().ok(), Some(Request::Exit));
    }

    #[test]
    fn quick_presses_synthesize_a_double_click() {
        let conn = MockConnection::new();
        let session = session(&conn, "root { nextdesktop: DoubleClick }");
        let mut manager = WindowManager::new(&conn, vec![session]);

        conn.push_event(on_root(EventKind::ButtonPress, 1, 100));
        conn.push_event(on_root(EventKind::ButtonPress, 1, 200));
        conn.push_event(on_root(EventKind::ButtonPress, 1, 900));

        assert!(manager.run().is_err());
        assert_eq!(conn.current_desktop(), Some(1));
    }

    #[test]
    fn scan_adopts_mapped_windows() {
        let conn = MockConnection::new();
        let window = conn.client("xterm", Region::new(100, 100, 200, 100));
        conn.map_window(window);

        let mut manager = WindowManager::new(&conn, vec![session(&conn, "")]);
        manager.init();

        assert_eq!(conn.client_list(), vec![window]);
        assert_eq!(conn.focus(), Some(window));
    }

    #[test]
    fn map_requests_reach_the_screen_of_their_parent() {
        let conn = MockConnection::new();
        let mut manager = WindowManager::new(&conn, vec![session(&conn, "")]);

        let window = conn.client("xterm", Region::new(100, 100, 200, 100));
        conn.push_event(Event::MapRequest {
            window,
            parent: ROOT,
        });

        assert!(manager.run().is_err());
        assert_eq!(conn.client_list(), vec![window]);
    }

    #[test]
    fn motion_is_collapsed() {
        let conn = MockConnection::new();
        let mut manager = WindowManager::new(&conn, vec![session(&conn, "")]);

        let motion = |x| Event::Motion {
            window: ROOT,
            root_pos: Pos::new(x, 0),
            state: ModMask::empty(),
        };

        conn.push_event(motion(2));
        conn.push_event(motion(3));
        conn.push_event(Event::Mapping);

        let event = manager.collapse_motion(motion(1));

        assert_eq!(event, motion(3));
        assert_eq!(manager.pending.pop_front(), Some(Event::Mapping));
    }
}
