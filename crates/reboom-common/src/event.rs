// event.rs -- input event posting and tic command building
//
// The video/input backend (SDL or otherwise) is an external collaborator:
// the only thing it may do to the simulation is post discriminated events
// here. The responder folds held-key state into one TicCmd per tic, which
// is all the player thinker ever sees.

use bitflags::bitflags;

/// Discriminated input event, as translated by the platform layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    KeyDown(Key),
    KeyUp(Key),
    MouseMotion { dx: i32, dy: i32, buttons: u8 },
    JoyMove { axis_x: i16, axis_y: i16, buttons: u8 },
}

/// Platform-independent key code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Key(pub u8);

pub const KEY_UP: Key = Key(0xad);
pub const KEY_DOWN: Key = Key(0xaf);
pub const KEY_LEFT: Key = Key(0xac);
pub const KEY_RIGHT: Key = Key(0xae);
pub const KEY_FIRE: Key = Key(0x9d);
pub const KEY_USE: Key = Key(0x20);
pub const KEY_STRAFE_L: Key = Key(0x2c);
pub const KEY_STRAFE_R: Key = Key(0x2e);

const MAX_EVENTS: usize = 64;

/// Bounded event ring. When full, the oldest event is dropped; input is
/// transient data and stalling the poster is worse than losing a stale
/// keystroke.
pub struct EventQueue {
    events: [Option<Event>; MAX_EVENTS],
    head: usize,
    tail: usize,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        EventQueue {
            events: [None; MAX_EVENTS],
            head: 0,
            tail: 0,
        }
    }

    /// The single entry point the platform layer calls.
    pub fn post(&mut self, ev: Event) {
        self.events[self.head] = Some(ev);
        self.head = (self.head + 1) % MAX_EVENTS;
        if self.head == self.tail {
            // overwrote the oldest pending event
            self.tail = (self.tail + 1) % MAX_EVENTS;
        }
    }

    pub fn poll(&mut self) -> Option<Event> {
        if self.tail == self.head {
            return None;
        }
        let ev = self.events[self.tail].take();
        self.tail = (self.tail + 1) % MAX_EVENTS;
        ev
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Buttons: u8 {
        const ATTACK = 0x01;
        const USE    = 0x02;
    }
}

/// One tic worth of player intent. forwardmove/sidemove are signed thrust
/// units; angleturn is in BAM>>16 like the original wire format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TicCmd {
    pub forwardmove: i8,
    pub sidemove: i8,
    pub angleturn: i16,
    pub buttons: Buttons,
}

const FORWARD_SPEED: i8 = 25;
const SIDE_SPEED: i8 = 24;
const TURN_SPEED: i16 = 640;

/// Tracks held keys between tics and folds events into tic commands.
pub struct Responder {
    down: [bool; 256],
    mouse_dx: i32,
    mouse_buttons: u8,
}

impl Default for Responder {
    fn default() -> Self {
        Responder { down: [false; 256], mouse_dx: 0, mouse_buttons: 0 }
    }
}

impl Responder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, ev: Event) {
        match ev {
            Event::KeyDown(k) => self.down[k.0 as usize] = true,
            Event::KeyUp(k) => self.down[k.0 as usize] = false,
            Event::MouseMotion { dx, buttons, .. } => {
                self.mouse_dx += dx;
                self.mouse_buttons = buttons;
            }
            Event::JoyMove { .. } => {}
        }
    }

    fn is_down(&self, k: Key) -> bool {
        self.down[k.0 as usize]
    }

    /// Drain the queue and produce the command for the coming tic.
    pub fn build_ticcmd(&mut self, queue: &mut EventQueue) -> TicCmd {
        while let Some(ev) = queue.poll() {
            self.handle(ev);
        }

        let mut cmd = TicCmd::default();
        if self.is_down(KEY_UP) {
            cmd.forwardmove = cmd.forwardmove.saturating_add(FORWARD_SPEED);
        }
        if self.is_down(KEY_DOWN) {
            cmd.forwardmove = cmd.forwardmove.saturating_sub(FORWARD_SPEED);
        }
        if self.is_down(KEY_STRAFE_R) {
            cmd.sidemove = cmd.sidemove.saturating_add(SIDE_SPEED);
        }
        if self.is_down(KEY_STRAFE_L) {
            cmd.sidemove = cmd.sidemove.saturating_sub(SIDE_SPEED);
        }
        if self.is_down(KEY_LEFT) {
            cmd.angleturn = cmd.angleturn.saturating_add(TURN_SPEED);
        }
        if self.is_down(KEY_RIGHT) {
            cmd.angleturn = cmd.angleturn.saturating_sub(TURN_SPEED);
        }
        if self.is_down(KEY_FIRE) || (self.mouse_buttons & 1) != 0 {
            cmd.buttons |= Buttons::ATTACK;
        }
        if self.is_down(KEY_USE) {
            cmd.buttons |= Buttons::USE;
        }

        // accumulated mouse turn, consumed once
        let turn = (self.mouse_dx * 8).clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        cmd.angleturn = cmd.angleturn.saturating_sub(turn);
        self.mouse_dx = 0;

        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_and_poll_fifo() {
        let mut q = EventQueue::new();
        q.post(Event::KeyDown(KEY_UP));
        q.post(Event::KeyUp(KEY_UP));
        assert_eq!(q.poll(), Some(Event::KeyDown(KEY_UP)));
        assert_eq!(q.poll(), Some(Event::KeyUp(KEY_UP)));
        assert_eq!(q.poll(), None);
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut q = EventQueue::new();
        for i in 0..(MAX_EVENTS + 3) {
            q.post(Event::KeyDown(Key(i as u8)));
        }
        // the first events are gone, the newest survive
        let first = q.poll().unwrap();
        assert_ne!(first, Event::KeyDown(Key(0)));
        let mut last = first;
        while let Some(ev) = q.poll() {
            last = ev;
        }
        assert_eq!(last, Event::KeyDown(Key((MAX_EVENTS + 2) as u8)));
    }

    #[test]
    fn held_key_produces_thrust_every_tic() {
        let mut q = EventQueue::new();
        let mut r = Responder::new();
        q.post(Event::KeyDown(KEY_UP));

        let cmd = r.build_ticcmd(&mut q);
        assert_eq!(cmd.forwardmove, FORWARD_SPEED);

        // still held on the next tic, with no new events
        let cmd = r.build_ticcmd(&mut q);
        assert_eq!(cmd.forwardmove, FORWARD_SPEED);

        q.post(Event::KeyUp(KEY_UP));
        let cmd = r.build_ticcmd(&mut q);
        assert_eq!(cmd.forwardmove, 0);
    }

    #[test]
    fn opposing_keys_cancel() {
        let mut q = EventQueue::new();
        let mut r = Responder::new();
        q.post(Event::KeyDown(KEY_UP));
        q.post(Event::KeyDown(KEY_DOWN));
        let cmd = r.build_ticcmd(&mut q);
        assert_eq!(cmd.forwardmove, 0);
    }

    #[test]
    fn mouse_turn_consumed_once() {
        let mut q = EventQueue::new();
        let mut r = Responder::new();
        q.post(Event::MouseMotion { dx: 10, dy: 0, buttons: 0 });
        let cmd = r.build_ticcmd(&mut q);
        assert_eq!(cmd.angleturn, -80);
        let cmd = r.build_ticcmd(&mut q);
        assert_eq!(cmd.angleturn, 0);
    }

    #[test]
    fn fire_button_from_key_and_mouse() {
        let mut q = EventQueue::new();
        let mut r = Responder::new();
        q.post(Event::KeyDown(KEY_FIRE));
        let cmd = r.build_ticcmd(&mut q);
        assert!(cmd.buttons.contains(Buttons::ATTACK));

        q.post(Event::KeyUp(KEY_FIRE));
        q.post(Event::MouseMotion { dx: 0, dy: 0, buttons: 1 });
        let cmd = r.build_ticcmd(&mut q);
        assert!(cmd.buttons.contains(Buttons::ATTACK));
    }
}
