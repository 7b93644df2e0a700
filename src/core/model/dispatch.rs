use super::Session;

use crate::action::Action;
use crate::actionfile::Context;
use crate::binding::Binding;
use crate::change::Toggle;
use crate::client::ClientFlags;
use crate::decoration::Part;
use crate::desktop::desktop_bit;
use crate::matcher::matches;
use crate::matcher::Observed;
use crate::stack::MenuId;
use crate::timer::Interrupt;
use crate::timer::InterruptTarget;
use crate::timer::Timer;
use crate::util::Util;

use winsys::event::complete_request;
use winsys::event::Event;
use winsys::event::PropertyKind;
use winsys::event::ToggleAction;
use winsys::geometry::Dim;
use winsys::geometry::Region;
use winsys::input::EventKind;
use winsys::input::InputEvent;
use winsys::input::ModMask;
use winsys::window::Window;

use std::time::Instant;

/// What an input event lands on, with the binding list it selects.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Target {
    Client(Window, Context),
    Menu(MenuId, usize, Context),
    Edge(Context),
    Root,
}

impl Target {
    #[inline]
    fn context(self) -> Context {
        match self {
            Target::Client(_, context) | Target::Menu(_, _, context) | Target::Edge(context) => {
                context
            },
            Target::Root => Context::Root,
        }
    }

    #[inline]
    fn interrupt(self) -> InterruptTarget {
        match self {
            Target::Client(window, _) => InterruptTarget::Window(window),
            Target::Menu(id, item, _) => InterruptTarget::Menu(id, item),
            Target::Edge(_) | Target::Root => InterruptTarget::Root,
        }
    }
}

#[derive(Debug, Copy, Clone, Default)]
struct Outcome {
    fired: bool,
    replay: bool,
}

impl<'a> Session<'a> {
    fn locate(
        &self,
        window: Window,
    ) -> Target {
        if let Some(client) = self.client(window) {
            let owner = client.window();

            let context = if window == owner {
                if client.is_focused() {
                    Context::WindowActiveClient
                } else {
                    Context::WindowPassiveClient
                }
            } else {
                client
                    .part_of(window)
                    .map_or(Context::WindowFrame, Part::context)
            };

            return Target::Client(owner, context);
        }

        if let Some(menu) = self
            .menu_windows
            .get(&window)
            .and_then(|id| self.menus.get(id))
        {
            return match menu.item_of(window) {
                Some(item) => Target::Menu(menu.id, item, menu.items[item].kind.context()),
                None => Target::Menu(
                    menu.id,
                    menu.hilite.or_else(|| menu.first_selectable()).unwrap_or(0),
                    Context::MenuTitle,
                ),
            };
        }

        match self.edges.iter().find(|&&(edge, _)| edge == window) {
            Some(&(_, context)) => Target::Edge(context),
            None => Target::Root,
        }
    }

    /// Keys arrive on the root window; they go to the menu holding the
    /// keyboard, else to the focused window.
    fn key_target(&self) -> Target {
        if let Some(menu) = self.menu_focus.and_then(|id| self.menus.get(&id)) {
            let item = menu.hilite.or_else(|| menu.first_selectable()).unwrap_or(0);
            let kind = menu
                .items
                .get(item)
                .map_or(Context::MenuItem, |item| item.kind.context());

            return Target::Menu(menu.id, item, kind);
        }

        match self.focus {
            Some(window) if self.clients.contains_key(&window) => {
                Target::Client(window, Context::WindowFrame)
            },
            _ => Target::Root,
        }
    }

    /// Runs every binding of `target` that matches the event.
    fn run_bindings(
        &mut self,
        target: Target,
        event: &InputEvent,
        timer: &mut Timer,
    ) -> Outcome {
        let observed = Observed::from_event(event, self.gesture.is_some());
        let ident = match target {
            Target::Client(window, _) => self.clients.get(&window).map(|client| client.ident()),
            _ => None,
        };

        let bindings: Vec<Binding> = self
            .tables
            .candidates(target.context(), ident.as_ref())
            .into_iter()
            .filter(|binding| matches(binding, &observed))
            .cloned()
            .collect();

        let mut outcome = Outcome::default();

        for binding in bindings {
            outcome.fired = true;
            outcome.replay |= binding.replay;

            if binding.is_delayed() {
                timer.schedule(Interrupt::new(
                    Instant::now(),
                    self.index,
                    target.interrupt(),
                    binding,
                    *event,
                ));
            } else {
                self.run_binding(target, &binding, Some(event));
            }
        }

        outcome
    }

    fn run_binding(
        &mut self,
        target: Target,
        binding: &Binding,
        event: Option<&InputEvent>,
    ) {
        trace!("running {} on {:?}", binding, target);

        let param = binding.param();

        match (binding.action, target) {
            (Action::Exec, _) => {
                if let Some(command) = &binding.exec {
                    Util::spawn_shell(command, &self.env);
                }
            },
            (Action::Window(action), Target::Client(window, _)) => {
                self.window_action(window, action, param, event)
            },
            (Action::Menu(action), Target::Menu(id, item, _)) => {
                self.menu_action(id, item, action, param, event)
            },
            (Action::Root(action), _) => self.root_action(action, param, event),
            (action, target) => debug!("{} does not apply to {:?}", action, target),
        }
    }

    /// Dispatches one input event to the bindings of whatever it landed on.
    pub fn dispatch_input(
        &mut self,
        event: &InputEvent,
        timer: &mut Timer,
    ) {
        timer.begin_dispatch();

        let grabbed = matches!(
            event.kind,
            EventKind::KeyPress
                | EventKind::KeyRelease
                | EventKind::ButtonPress
                | EventKind::ButtonRelease
        );

        if self.task_switch_input(event) {
            if grabbed {
                self.conn.allow_events(event.kind.is_key(), false);
            }

            return;
        }

        let target = if event.kind.is_key() {
            self.key_target()
        } else {
            self.locate(event.window)
        };

        if event.kind == EventKind::EnterNotify {
            if let Target::Menu(id, item, context) = target {
                if context != Context::MenuTitle {
                    self.hilite(id, item);
                }
            }
        }

        let mut outcome = self.run_bindings(target, event, timer);

        if event.kind.is_key() && !outcome.fired && target != Target::Root {
            outcome = self.run_bindings(Target::Root, event, timer);
        }

        if grabbed {
            self.conn
                .allow_events(event.kind.is_key(), outcome.replay || !outcome.fired);
        }

        timer.validate(event.kind, event.window);

        let ends_gesture = event.kind == EventKind::ButtonRelease
            && self
                .gesture
                .as_ref()
                .and_then(|gesture| gesture.button())
                .map_or(false, |button| button == event.detail);

        if ends_gesture {
            self.end_gesture();
        }
    }

    /// Runs a delayed binding, unless its target went away meanwhile.
    pub fn fire(
        &mut self,
        interrupt: Interrupt,
    ) {
        let target = match interrupt.target {
            InterruptTarget::Window(window) if self.clients.contains_key(&window) => {
                Target::Client(window, Context::WindowFrame)
            },
            InterruptTarget::Menu(id, item)
                if self
                    .menus
                    .get(&id)
                    .map_or(false, |menu| item < menu.items.len()) =>
            {
                Target::Menu(id, item, Context::MenuItem)
            },
            InterruptTarget::Root => Target::Root,
            _ => {
                debug!("dropping {} for a vanished target", interrupt.binding.action);
                return;
            },
        };

        self.run_binding(target, &interrupt.binding, Some(&interrupt.event));
    }

    /// Runs the `MapRequest` bindings of a freshly adopted window.
    fn run_map_bindings(
        &mut self,
        window: Window,
        timer: &mut Timer,
    ) {
        if !self.clients.contains_key(&window) {
            return;
        }

        let event = InputEvent::new(EventKind::MapRequest, 0, ModMask::empty(), window);
        self.run_bindings(Target::Client(window, Context::WindowFrame), &event, timer);
    }

    /// Handles one event from the window system.
    pub fn handle_event(
        &mut self,
        event: Event,
        timer: &mut Timer,
    ) {
        if matches!(event, Event::MapRequest { .. }) {
            if let Some(gesture) = self.gesture.as_mut() {
                gesture.defer(event);
                return;
            }
        }

        match event {
            Event::Input(input) => self.dispatch_input(&input, timer),
            Event::Motion {
                root_pos, ..
            } => self.gesture_motion(root_pos),
            Event::MapRequest {
                window, ..
            } => {
                if self.clients.contains_key(&window) {
                    self.set_minimized(window, Toggle::Off);
                    return;
                }

                self.adopt(window);
                self.run_map_bindings(window, timer);
            },
            Event::Unmap {
                window, ..
            } => self.handle_unmap(window),
            Event::Destroy {
                window,
            } => {
                timer.forget_window(window);
                self.unmanage(window, true);
                self.release_dockapp(window, true);
            },
            Event::ConfigureRequest {
                window,
                pos,
                dim,
            } => self.handle_configure_request(window, pos, dim),
            Event::Property {
                window,
                kind,
            } => self.handle_property(window, kind),
            Event::StateRequest {
                window,
                states,
                action,
            } => {
                if !self.clients.contains_key(&window) {
                    return;
                }

                let toggle = match action {
                    ToggleAction::Add => Toggle::On,
                    ToggleAction::Remove => Toggle::Off,
                    ToggleAction::Toggle => Toggle::Reverse,
                };

                for state in states {
                    self.apply_state(window, state, toggle);
                }
            },
            Event::DesktopRequest {
                window,
                index,
            } => {
                if window == self.screen.root() {
                    if (index as usize) < self.desktops.count() {
                        self.goto_desktop(index as usize);
                    }
                } else if index == 0xffff_ffff {
                    self.set_desktops(window, self.desktops.all());
                } else if (index as usize) < self.desktops.count() {
                    self.set_desktops(window, desktop_bit(index as usize));
                }
            },
            Event::ActivateRequest {
                window,
            } => self.activate(window),
            Event::CloseRequest {
                window,
            } => {
                if self.clients.contains_key(&window) {
                    self.conn.close_window(window);
                }
            },
            Event::ViewportRequest {
                window,
                pos,
            } => {
                if window == self.screen.root() {
                    self.pan_viewport(pos);
                }
            },
            Event::Expose {
                window,
            } => {
                if let Some(&id) = self.menu_windows.get(&window) {
                    self.draw_menu(id);
                } else if let Some(owner) = self.client(window).map(|client| client.window()) {
                    self.decorate(owner);
                }
            },
            Event::Mapping => {
                self.keys = self.conn.keymap();
                self.grab_keys();
            },
        }
    }

    fn handle_unmap(
        &mut self,
        window: Window,
    ) {
        if let Some(client) = self.clients.get(&window) {
            if !client.consume_unmap_if_expecting() {
                self.unmanage(window, false);
            }

            return;
        }

        match self.dockapp_unmaps.get_mut(&window) {
            Some(count) if *count > 0 => *count -= 1,
            _ => self.release_dockapp(window, false),
        }
    }

    fn handle_configure_request(
        &mut self,
        window: Window,
        pos: (Option<i32>, Option<i32>),
        dim: (Option<i32>, Option<i32>),
    ) {
        if let Some(client) = self.clients.get(&window) {
            let region = client.region();

            if client.flags().intersects(ClientFlags::MAXED | ClientFlags::FULLSCREEN)
                || client.master().is_some()
            {
                self.conn.send_configure_notify(window, region);
                return;
            }

            let (pos, dim) = complete_request(pos, dim, region.pos, region.dim);
            let region = Region {
                pos,
                dim: client.size_hints().constrain(dim),
            };

            client.set_region(region);

            self.configure_client(window);
            self.decorate(window);
            self.conn
                .set_virtual_pos(window, region.pos + self.viewport_offset());

            return;
        }

        if let Some(index) = self.docks.holding(window) {
            let resized = match (self.docks.get_mut(index), dim) {
                (Some(handler), (Some(w), Some(h))) => {
                    handler.resize_app(window, Dim::new(w, h))
                },
                _ => false,
            };

            if resized {
                self.update_dock(index);
            }

            return;
        }

        match self.conn.window_geometry(window) {
            Ok(current) => {
                let (pos, dim) = complete_request(pos, dim, current.pos, current.dim);
                self.conn.place_window(window, &Region {
                    pos,
                    dim,
                });
            },
            Err(err) => debug!("ignoring configure request of {:#0x}: {}", window, err),
        }
    }

    fn handle_property(
        &mut self,
        window: Window,
        kind: PropertyKind,
    ) {
        let client = match self.clients.get(&window) {
            Some(client) => client,
            None => return,
        };

        match kind {
            PropertyKind::Name => {
                client.set_title(self.conn.get_wm_name(window));
                self.decorate(window);
            },
            PropertyKind::Class => {
                let (name, class) = self.conn.get_wm_class(window);
                client.set_class(name, class);
            },
            PropertyKind::Size => {
                client.set_size_hints(self.conn.get_size_hints(window).unwrap_or_default());
            },
            PropertyKind::Hints => client.set_hints(self.conn.get_wm_hints(window)),
            PropertyKind::Strut => {
                let struts = self.conn.get_window_struts(window);

                if self.screen.set_struts(window, struts) {
                    self.update_workarea();
                }
            },
        }
    }
}
