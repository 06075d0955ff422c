//! Unit tests for masfro-bus.

#[cfg(test)]
mod helpers {
    use masfro_core::{AgentId, Timestamp};

    use crate::{Envelope, Payload};

    pub fn agent(name: &str) -> AgentId {
        AgentId::from(name)
    }

    pub fn ping(from: &str, to: &str) -> Envelope {
        Envelope::request(agent(from), agent(to), Payload::CollectRequest, Timestamp(0.0))
    }
}

#[cfg(test)]
mod delivery {
    use masfro_core::Timestamp;

    use super::helpers::{agent, ping};
    use crate::{BusError, Envelope, MessageBus, Payload, Performative};

    #[test]
    fn fifo_order_preserved() {
        let bus = MessageBus::new();
        bus.register_default(agent("hazard")).unwrap();

        for i in 0..5 {
            let mut env = ping("flood", "hazard");
            env.sent_at = Timestamp(i as f64);
            bus.send(env).unwrap();
        }

        for i in 0..5 {
            let env = bus.recv(&agent("hazard")).unwrap().unwrap();
            assert_eq!(env.sent_at, Timestamp(i as f64));
        }
        assert!(bus.recv(&agent("hazard")).unwrap().is_none());
    }

    #[test]
    fn at_most_once() {
        let bus = MessageBus::new();
        bus.register_default(agent("router")).unwrap();
        bus.send(ping("orchestrator", "router")).unwrap();

        assert!(bus.recv(&agent("router")).unwrap().is_some());
        assert!(bus.recv(&agent("router")).unwrap().is_none());
    }

    #[test]
    fn unknown_queue_is_typed_error() {
        let bus = MessageBus::new();
        let err = bus.send(ping("a", "nobody")).unwrap_err();
        assert!(matches!(err, BusError::QueueNotFound(_)));
        assert!(bus.recv(&agent("nobody")).is_err());
    }

    #[test]
    fn full_queue_rejects_send() {
        let bus = MessageBus::new();
        bus.register(agent("tiny"), 2).unwrap();

        bus.send(ping("a", "tiny")).unwrap();
        bus.send(ping("a", "tiny")).unwrap();
        let err = bus.send(ping("a", "tiny")).unwrap_err();
        assert!(matches!(err, BusError::QueueFull { capacity: 2, .. }));

        // Draining one slot frees capacity.
        bus.recv(&agent("tiny")).unwrap();
        assert!(bus.send(ping("a", "tiny")).is_ok());
    }

    #[test]
    fn double_register_rejected() {
        let bus = MessageBus::new();
        bus.register_default(agent("scout")).unwrap();
        assert!(matches!(
            bus.register_default(agent("scout")),
            Err(BusError::AlreadyRegistered(_))
        ));
    }

    #[test]
    fn reply_echoes_conversation_id() {
        let bus = MessageBus::new();
        bus.register_default(agent("router")).unwrap();
        bus.register_default(agent("orchestrator")).unwrap();

        let request = ping("orchestrator", "router");
        let conversation = request.conversation_id;
        bus.send(request).unwrap();

        let received = bus.recv(&agent("router")).unwrap().unwrap();
        let reply = Envelope::reply_to(
            &received,
            agent("router"),
            Payload::CollectReply { observations: 0 },
            Timestamp(1.0),
        );
        assert_eq!(reply.conversation_id, conversation);
        assert_eq!(reply.performative, Performative::Reply);
        bus.send(reply).unwrap();

        let got = bus.recv(&agent("orchestrator")).unwrap().unwrap();
        assert_eq!(got.conversation_id, conversation);
    }

    #[test]
    fn clear_and_queue_size() {
        let bus = MessageBus::new();
        bus.register_default(agent("hazard")).unwrap();
        bus.send(ping("a", "hazard")).unwrap();
        bus.send(ping("b", "hazard")).unwrap();

        assert_eq!(bus.queue_size(&agent("hazard")).unwrap(), 2);
        assert_eq!(bus.clear(&agent("hazard")).unwrap(), 2);
        assert_eq!(bus.queue_size(&agent("hazard")).unwrap(), 0);
    }
}

#[cfg(test)]
mod broadcast {
    use masfro_core::Timestamp;

    use super::helpers::agent;
    use crate::{Envelope, MessageBus, Payload};

    #[test]
    fn broadcast_excludes_sender() {
        let bus = MessageBus::new();
        for name in ["flood", "hazard", "router"] {
            bus.register_default(agent(name)).unwrap();
        }

        let env = Envelope::broadcast(agent("flood"), Payload::CollectRequest, Timestamp(0.0));
        let delivered = bus.broadcast(env, true);

        assert_eq!(delivered, 2);
        assert_eq!(bus.queue_size(&agent("flood")).unwrap(), 0);
        assert_eq!(bus.queue_size(&agent("hazard")).unwrap(), 1);
        assert_eq!(bus.queue_size(&agent("router")).unwrap(), 1);
    }
}

#[cfg(test)]
mod blocking {
    use std::sync::Arc;
    use std::time::Duration;

    use super::helpers::{agent, ping};
    use crate::MessageBus;

    #[test]
    fn recv_timeout_times_out_empty() {
        let bus = MessageBus::new();
        bus.register_default(agent("hazard")).unwrap();
        let got = bus
            .recv_timeout(&agent("hazard"), Duration::from_millis(20))
            .unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn recv_timeout_wakes_on_send() {
        let bus = Arc::new(MessageBus::new());
        bus.register_default(agent("hazard")).unwrap();

        let sender = {
            let bus = bus.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(30));
                bus.send(ping("flood", "hazard")).unwrap();
            })
        };

        let got = bus
            .recv_timeout(&agent("hazard"), Duration::from_secs(5))
            .unwrap();
        assert!(got.is_some());
        sender.join().unwrap();
    }
}
