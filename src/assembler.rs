//! Reassembly of multi-sentence VDM/VDO messages.
//!
//! Groups are keyed by fragment count, sequential message id, channel and VDM/VDO. Time is a
//! tick counted in processed sentences: a group expires one cleanup interval after its first
//! fragment, and expired groups are swept every interval.

use crate::channel::Channel;
use crate::frame::VdmPacket;
use crate::sentence::VdmSentence;
use crate::tagblock::TagBlock;
use std::collections::HashMap;
use tracing::{debug, trace};

pub const CLEANUP_INTERVAL: u64 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct GroupKey {
    fragment_count: i64,
    message_id: i64,
    channel: u8,
    vdo: bool,
}

#[derive(Debug)]
struct Group {
    expiry: u64,
    /// Bit `i` set once fragment `i + 1` arrived.
    received: u16,
    fragments: Vec<VdmSentence>,
}

#[derive(Debug)]
pub struct Assembler {
    last_channel: u8,
    counter: u64,
    next_cleanup: u64,
    groups: HashMap<GroupKey, Group>,
}

impl Default for Assembler {
    fn default() -> Self {
        Assembler::new()
    }
}

impl Assembler {
    pub fn new() -> Self {
        Assembler {
            last_channel: b'A',
            counter: 0,
            next_cleanup: 0,
            groups: HashMap::new(),
        }
    }

    /// Number of fragments held across all pending groups.
    pub fn buffered_messages(&self) -> usize {
        self.groups.values().map(|g| g.fragments.len()).sum()
    }

    /// Feed one sentence; returns the raw payload once its group is complete.
    pub fn process(&mut self, sentence: VdmSentence) -> Option<VdmPacket> {
        let count = sentence.fragment_count;
        let index = sentence.fragment_index;
        if count <= 0 || count >= 10 || index > count || index <= 0 {
            trace!(count, index, "fragment numbers rejected");
            return None;
        }

        self.counter += 1;
        if self.counter >= self.next_cleanup {
            self.next_cleanup = self.counter + CLEANUP_INTERVAL;
            self.cleanup();
        }

        // An empty channel field repeats the previous one.
        if let Some(c) = sentence.channel {
            self.last_channel = c;
        }
        let channel = Channel::from_designator(self.last_channel);

        if count == 1 {
            return Some(VdmPacket {
                channel,
                talker_id: sentence.talker_id,
                message_type: sentence.message_type,
                payload: sentence.payload,
                message: None,
                tag_block: sentence.tag_block,
            });
        }

        let key = GroupKey {
            fragment_count: count,
            message_id: sentence.message_id,
            channel: self.last_channel,
            vdo: sentence.is_vdo(),
        };
        let expiry = self.counter + CLEANUP_INTERVAL;
        let group = self.groups.entry(key).or_insert_with(|| Group {
            expiry,
            received: 0,
            fragments: Vec::with_capacity(count as usize),
        });
        group.received |= 1u16 << (index - 1);
        let talker_id = sentence.talker_id.clone();
        let message_type = sentence.message_type.clone();
        group.fragments.push(sentence);

        let all = (1u16 << count) - 1;
        if group.fragments.len() < count as usize || group.received & all != all {
            return None;
        }

        let group = self.groups.remove(&key)?;
        let mut payload = Vec::new();
        for i in 1..=count {
            if let Some(f) = group.fragments.iter().find(|f| f.fragment_index == i) {
                payload.extend_from_slice(&f.payload);
            }
        }
        let mut tag_block = TagBlock::default();
        for f in &group.fragments {
            tag_block.merge(&f.tag_block);
        }
        trace!(count, message_id = key.message_id, bits = payload.len(), "group reassembled");

        Some(VdmPacket {
            channel,
            talker_id,
            message_type,
            payload,
            message: None,
            tag_block,
        })
    }

    fn cleanup(&mut self) {
        let counter = self.counter;
        let before = self.groups.len();
        self.groups.retain(|_, g| counter < g.expiry);
        let dropped = before - self.groups.len();
        if dropped > 0 {
            debug!(dropped, tick = counter, "expired fragment groups dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(count: i64, index: i64, message_id: i64, bits: &[u8]) -> VdmSentence {
        VdmSentence {
            talker_id: "AI".to_string(),
            message_type: "VDM".to_string(),
            fragment_count: count,
            fragment_index: index,
            message_id,
            channel: Some(b'A'),
            payload: bits.to_vec(),
            ..VdmSentence::default()
        }
    }

    #[test]
    fn rejects_bad_numbers() {
        let mut a = Assembler::new();
        for (count, index) in [(0, 0), (10, 1), (2, 3), (2, 0), (-1, 1)] {
            assert!(a.process(fragment(count, index, 1, &[1])).is_none());
        }
        assert_eq!(a.counter, 0);
        assert_eq!(a.buffered_messages(), 0);
    }

    #[test]
    fn reassembles_in_index_order() {
        let mut a = Assembler::new();
        assert!(a.process(fragment(3, 3, 4, &[0, 0])).is_none());
        assert!(a.process(fragment(3, 1, 4, &[1])).is_none());
        assert_eq!(a.buffered_messages(), 2);
        let packet = a.process(fragment(3, 2, 4, &[1, 0])).unwrap();
        assert_eq!(packet.payload, vec![1, 1, 0, 0, 0]);
        assert_eq!(a.buffered_messages(), 0);
    }

    #[test]
    fn duplicate_index_does_not_complete() {
        let mut a = Assembler::new();
        assert!(a.process(fragment(2, 1, 5, &[1])).is_none());
        assert!(a.process(fragment(2, 1, 5, &[1])).is_none());
        assert_eq!(a.buffered_messages(), 2);
        assert!(a.process(fragment(2, 2, 5, &[0])).is_some());
    }

    #[test]
    fn empty_channel_reuses_last() {
        let mut a = Assembler::new();
        let mut first = fragment(1, 1, 0, &[1]);
        first.channel = Some(b'B');
        assert_eq!(a.process(first).unwrap().channel, Channel::B);
        let mut second = fragment(1, 1, 0, &[1]);
        second.channel = None;
        assert_eq!(a.process(second).unwrap().channel, Channel::B);
    }

    #[test]
    fn incomplete_groups_expire() {
        let mut a = Assembler::new();
        for round in 0..100 {
            for id in 0..9 {
                assert!(a.process(fragment(2, 1, id, &[1])).is_none());
                assert!(a.process(fragment(2, 2, id, &[0])).is_some());
            }
            assert!(a.process(fragment(2, 1, 1000 + round, &[1])).is_none());
            assert!(a.buffered_messages() <= 5, "round {}", round);
        }

        // Orphans alone: everything older than one interval is gone after a sweep.
        let mut a = Assembler::new();
        for id in 0..100 {
            a.process(fragment(2, 1, id, &[1]));
        }
        assert!(a.groups.len() <= CLEANUP_INTERVAL as usize + 3);
        assert!(a.groups.keys().all(|k| k.message_id > 100 - CLEANUP_INTERVAL as i64 - 4));
    }
}
