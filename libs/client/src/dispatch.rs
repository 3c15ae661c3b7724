//! Command queue and dispatcher.
//!
//! The protocol carries no request identifiers, so every inbound frame
//! belongs to the oldest command still waiting. [`Dispatcher`] keeps that
//! pairing honest: commands are transmitted strictly in enqueue order, only
//! one is ever on the wire, and a frame that arrives with nothing pending
//! halts the dispatcher for good.
//!
//! The dispatcher does no I/O. `enqueue` and `on_inbound` hand back the frame
//! the caller must transmit next, if any.

use std::collections::VecDeque;

use tokio::sync::oneshot;
use usb2snes_core::Command;
use usb2snes_fabric::{Codec, Frame, Response};

use crate::error::{Error, Result};

/// A queued command and the handle that completes its caller's future
pub struct PendingCommand {
    command: Command,
    resolver: oneshot::Sender<Result<Response>>,
}

impl PendingCommand {
    pub fn new(command: Command) -> (Self, oneshot::Receiver<Result<Response>>) {
        let (resolver, rx) = oneshot::channel();
        (Self { command, resolver }, rx)
    }

    /// Complete the caller's future; consumes the command so it fires once
    pub fn resolve(self, result: Result<Response>) {
        if self.resolver.send(result).is_err() {
            tracing::debug!(opcode = %self.command.opcode, "response dropped, caller went away");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Nothing is on the wire
    Idle,
    /// The queue head has been transmitted and awaits its reply
    Dispatching,
}

/// Snapshot of the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub state: DispatchState,
    pub queued: usize,
    pub halted: bool,
}

pub struct Dispatcher<C> {
    codec: C,
    queue: VecDeque<PendingCommand>,
    state: DispatchState,
    halted: bool,
}

impl<C: Codec> Dispatcher<C> {
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            queue: VecDeque::new(),
            state: DispatchState::Idle,
            halted: false,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether a desync has stopped all further dispatch
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn status(&self) -> Status {
        Status {
            state: self.state,
            queued: self.queue.len(),
            halted: self.halted,
        }
    }

    /// Append a command to the tail, returning the frame to transmit if the
    /// dispatcher was idle
    pub fn enqueue(&mut self, pending: PendingCommand) -> Option<Frame> {
        if self.halted {
            pending.resolve(Err(Error::Desync));
            return None;
        }
        self.queue.push_back(pending);
        self.trigger()
    }

    /// Transmit the head if nothing is in flight; a no-op while dispatching
    pub fn trigger(&mut self) -> Option<Frame> {
        match self.state {
            DispatchState::Dispatching => None,
            DispatchState::Idle => self.transmit_head(),
        }
    }

    /// Pair an inbound frame with the queue head
    ///
    /// Resolves the head with the decoded frame (or the decode error) and
    /// returns the next frame to transmit. A frame with no pending command
    /// is a desync: the dispatcher halts and [`Error::Desync`] is returned.
    pub fn on_inbound(&mut self, frame: Frame) -> Result<Option<Frame>> {
        if self.halted {
            tracing::warn!(binary = frame.is_binary(), "dropping frame received after desync");
            return Ok(None);
        }

        let Some(head) = self.queue.pop_front() else {
            tracing::error!(binary = frame.is_binary(), "inbound frame with no pending command");
            self.halted = true;
            self.state = DispatchState::Idle;
            return Err(Error::Desync);
        };

        let result = self.codec.decode(frame).map_err(Error::from);
        match &result {
            Ok(_) => tracing::debug!(opcode = %head.command.opcode, "response matched"),
            Err(e) => tracing::warn!(opcode = %head.command.opcode, "rejecting command: {}", e),
        }
        head.resolve(result);

        Ok(self.transmit_head())
    }

    /// Reject every queued command with [`Error::Abandoned`]
    ///
    /// Meant for a connection that is already gone: a reply to the rejected
    /// head that still arrives afterwards would be paired with whatever is
    /// queued next.
    pub fn reject_pending(&mut self) -> usize {
        let rejected = self.queue.len();
        for pending in self.queue.drain(..) {
            pending.resolve(Err(Error::Abandoned));
        }
        self.state = DispatchState::Idle;
        rejected
    }

    fn transmit_head(&mut self) -> Option<Frame> {
        while let Some(head) = self.queue.front() {
            match self.codec.encode(&head.command) {
                Ok(frame) => {
                    tracing::debug!(opcode = %head.command.opcode, queued = self.queue.len(), "transmitting");
                    self.state = DispatchState::Dispatching;
                    return Some(frame);
                }
                Err(e) => {
                    if let Some(unsendable) = self.queue.pop_front() {
                        unsendable.resolve(Err(e.into()));
                    }
                }
            }
        }
        self.state = DispatchState::Idle;
        None
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::sync::oneshot::error::TryRecvError;
    use usb2snes_core::Opcode;
    use usb2snes_fabric::{Error as FabricError, JsonCodec};

    use super::*;

    type Receiver = oneshot::Receiver<Result<Response>>;

    fn results(items: &[&str]) -> Frame {
        Frame::Text(json!({ "Results": items }).to_string())
    }

    fn queue(dispatcher: &mut Dispatcher<JsonCodec>, command: Command) -> (Option<Frame>, Receiver) {
        let (pending, rx) = PendingCommand::new(command);
        (dispatcher.enqueue(pending), rx)
    }

    fn resolved(rx: &mut Receiver) -> Result<Response> {
        rx.try_recv().expect("command should be resolved")
    }

    #[test]
    fn example_session_resolves_in_order_and_goes_idle() {
        let mut dispatcher = Dispatcher::new(JsonCodec);

        let (sent, mut first) = queue(
            &mut dispatcher,
            Command::new(Opcode::GetAddress).operands(["f50010", "2"]),
        );
        assert_eq!(
            sent,
            Some(Frame::Text(
                r#"{"Opcode":"GetAddress","Space":"SNES","Operands":["f50010","2"]}"#.into()
            ))
        );

        let (sent, mut second) = queue(&mut dispatcher, Command::new(Opcode::Info));
        assert_eq!(sent, None, "second command must wait for the first reply");
        assert_eq!(dispatcher.state(), DispatchState::Dispatching);

        let next = dispatcher.on_inbound(results(&["0042"])).unwrap();
        assert_eq!(next, Some(Frame::Text(r#"{"Opcode":"Info","Space":"SNES"}"#.into())));
        assert_eq!(
            resolved(&mut first).unwrap(),
            Response::Results(vec!["0042".into()])
        );
        assert!(matches!(second.try_recv(), Err(TryRecvError::Empty)));

        let next = dispatcher.on_inbound(results(&["1.0", "SD2SNES"])).unwrap();
        assert_eq!(next, None);
        assert_eq!(
            resolved(&mut second).unwrap(),
            Response::Results(vec!["1.0".into(), "SD2SNES".into()])
        );
        assert_eq!(dispatcher.state(), DispatchState::Idle);
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn responses_pair_with_commands_in_fifo_order() {
        let mut dispatcher = Dispatcher::new(JsonCodec);
        let mut receivers = Vec::new();
        let mut transmitted = 0;

        for i in 0..5 {
            let (sent, rx) = queue(&mut dispatcher, Command::new("List").operand(i.to_string()));
            transmitted += usize::from(sent.is_some());
            receivers.push(rx);
        }
        assert_eq!(transmitted, 1, "only the head goes out while dispatching");

        for i in 0..5 {
            let frame = if i % 2 == 0 {
                Frame::Binary(vec![i as u8])
            } else {
                results(&[i.to_string().as_str()])
            };
            let next = dispatcher.on_inbound(frame).unwrap();
            assert_eq!(next.is_some(), i < 4);
        }

        for (i, rx) in receivers.iter_mut().enumerate() {
            let expected = if i % 2 == 0 {
                Response::Binary(vec![i as u8])
            } else {
                Response::Results(vec![i.to_string()])
            };
            assert_eq!(resolved(rx).unwrap(), expected);
        }
        assert_eq!(dispatcher.state(), DispatchState::Idle);
    }

    #[test]
    fn trigger_is_a_no_op_while_dispatching() {
        let mut dispatcher = Dispatcher::new(JsonCodec);
        let (_sent, _first) = queue(&mut dispatcher, Command::new(Opcode::Info));
        let (_sent, _second) = queue(&mut dispatcher, Command::new(Opcode::Info));

        assert_eq!(dispatcher.trigger(), None);
        assert_eq!(dispatcher.trigger(), None);
        assert_eq!(
            dispatcher.status(),
            Status {
                state: DispatchState::Dispatching,
                queued: 2,
                halted: false,
            }
        );
    }

    #[test]
    fn idle_dispatcher_restarts_on_enqueue() {
        let mut dispatcher = Dispatcher::new(JsonCodec);
        let (_sent, _first) = queue(&mut dispatcher, Command::new(Opcode::Info));
        dispatcher.on_inbound(results(&[])).unwrap();
        assert_eq!(dispatcher.state(), DispatchState::Idle);

        let (sent, _second) = queue(&mut dispatcher, Command::new(Opcode::AppVersion));
        assert!(sent.is_some());
        assert_eq!(dispatcher.state(), DispatchState::Dispatching);
    }

    #[test]
    fn frame_with_empty_queue_is_a_fatal_desync() {
        let mut dispatcher = Dispatcher::new(JsonCodec);

        let err = dispatcher.on_inbound(results(&["stray"])).unwrap_err();
        assert!(matches!(err, Error::Desync));
        assert!(dispatcher.is_halted());

        // Later commands are refused instead of being mis-paired
        let (sent, mut rx) = queue(&mut dispatcher, Command::new(Opcode::Info));
        assert_eq!(sent, None);
        assert!(matches!(resolved(&mut rx), Err(Error::Desync)));
        assert!(dispatcher.is_empty());

        // Further stray frames are dropped quietly
        assert!(dispatcher.on_inbound(Frame::Binary(vec![1])).unwrap().is_none());
    }

    #[test]
    fn undecodable_reply_rejects_only_its_command() {
        let mut dispatcher = Dispatcher::new(JsonCodec);
        let (_sent, mut first) = queue(&mut dispatcher, Command::new(Opcode::Info));
        let (_sent, mut second) = queue(&mut dispatcher, Command::new(Opcode::Info));

        let next = dispatcher
            .on_inbound(Frame::Text("{\"Nope\":1}".into()))
            .unwrap();
        assert!(next.is_some(), "queue keeps moving after a decode failure");
        assert!(matches!(
            resolved(&mut first),
            Err(Error::Fabric(FabricError::Protocol(_)))
        ));

        dispatcher.on_inbound(results(&["ok"])).unwrap();
        assert_eq!(
            resolved(&mut second).unwrap(),
            Response::Results(vec!["ok".into()])
        );
        assert!(!dispatcher.is_halted());
    }

    #[test]
    fn reject_pending_drains_the_queue() {
        let mut dispatcher = Dispatcher::new(JsonCodec);
        let (_sent, mut first) = queue(&mut dispatcher, Command::new(Opcode::Info));
        let (_sent, mut second) = queue(&mut dispatcher, Command::new(Opcode::List));

        assert_eq!(dispatcher.reject_pending(), 2);
        assert!(matches!(resolved(&mut first), Err(Error::Abandoned)));
        assert!(matches!(resolved(&mut second), Err(Error::Abandoned)));
        assert_eq!(dispatcher.state(), DispatchState::Idle);
    }

    #[test]
    fn dropped_caller_does_not_stall_the_queue() {
        let mut dispatcher = Dispatcher::new(JsonCodec);
        let (_sent, first) = queue(&mut dispatcher, Command::new(Opcode::Info));
        let (_sent, mut second) = queue(&mut dispatcher, Command::new(Opcode::Info));
        drop(first);

        assert!(dispatcher.on_inbound(results(&["a"])).unwrap().is_some());
        dispatcher.on_inbound(results(&["b"])).unwrap();
        assert_eq!(
            resolved(&mut second).unwrap(),
            Response::Results(vec!["b".into()])
        );
    }

    /// Codec that refuses to encode one opcode
    struct PickyCodec;

    impl Codec for PickyCodec {
        fn encode(&self, command: &Command) -> usb2snes_fabric::Result<Frame> {
            if command.opcode == "Bad" {
                return Err(FabricError::Codec("refused".into()));
            }
            JsonCodec.encode(command)
        }

        fn decode(&self, frame: Frame) -> usb2snes_fabric::Result<Response> {
            JsonCodec.decode(frame)
        }
    }

    #[test]
    fn unencodable_head_is_rejected_and_skipped() {
        let mut dispatcher = Dispatcher::new(PickyCodec);

        let (bad, mut bad_rx) = PendingCommand::new(Command::new("Bad"));
        assert_eq!(dispatcher.enqueue(bad), None);
        assert!(matches!(
            resolved(&mut bad_rx),
            Err(Error::Fabric(FabricError::Codec(_)))
        ));
        assert_eq!(dispatcher.state(), DispatchState::Idle);

        let (good, _good_rx) = PendingCommand::new(Command::new(Opcode::Info));
        let (bad, mut bad_rx) = PendingCommand::new(Command::new("Bad"));
        let (last, _last_rx) = PendingCommand::new(Command::new(Opcode::List));
        assert!(dispatcher.enqueue(good).is_some());
        assert!(dispatcher.enqueue(bad).is_none());
        assert!(dispatcher.enqueue(last).is_none());

        let next = dispatcher.on_inbound(results(&[])).unwrap();
        assert_eq!(next, Some(Frame::Text(r#"{"Opcode":"List","Space":"SNES"}"#.into())));
        assert!(matches!(
            resolved(&mut bad_rx),
            Err(Error::Fabric(FabricError::Codec(_)))
        ));
        assert_eq!(dispatcher.len(), 1);
    }
}
