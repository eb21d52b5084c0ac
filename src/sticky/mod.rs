//! Sticky partition balance strategy for Kafka consumer groups.
//!
//! The strategy hands every subscribed partition to exactly one member,
//! keeps the partition counts across members within one of each other
//! wherever the subscriptions allow it, and prefers giving members the
//! partitions they were already consuming before the rebalance. Members
//! ship their previous assignment inside their join user data (see
//! [`crate::protocol::messages`]); conflicting claims are settled by the
//! generation introduced in KIP-341.
//!
//! [`balance`] is a pure function: it performs no I/O and owns no state
//! beyond the call. Everything around it, such as finding the coordinator,
//! the join/sync round trips and fetching topic metadata, is the caller's
//! business.
//!
//! # References
//! - <https://cwiki.apache.org/confluence/display/KAFKA/KIP-341%3A+Update+Sticky+Assignor%27s+User+Data+Protocol>

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Cursor;

use tracing::{debug, trace};

use crate::protocol::messages::{StickyMemberMetadataV0, StickyMemberMetadataV1};
use crate::protocol::traits::ReadType;

mod heap;

use heap::LoadHeap;

/// Generation claimed by v0 user data, which carries none, and by user data
/// that fails to parse.
pub const DEFAULT_GENERATION: i32 = -1;

/// A member of the consumer group, as seen in the join response.
#[derive(Debug, Clone)]
pub struct GroupMember {
    /// Unique id within the group.
    pub id: String,

    /// Shape of the user data: 0 or 1. Anything else is treated as
    /// unparseable.
    pub version: i16,

    /// Topics the member is willing to consume.
    pub topics: Vec<String>,

    /// Opaque blob carrying the member's previous assignment.
    pub user_data: Vec<u8>,
}

/// The computed assignment: member id to topic to partitions.
///
/// Every input member appears as a key, possibly with an empty topic map.
pub type Plan = BTreeMap<String, BTreeMap<String, Vec<i32>>>;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct TopicPartition {
    topic: String,
    partition: i32,
}

/// Balances `topics` over `members`, sticking to the previous assignments
/// the members declared in their user data as far as balance permits.
///
/// `topics` is the caller's ground truth: partitions a member claims or
/// subscribes to that are missing from it are ignored. Member order does
/// not matter; two calls with the same inputs return the same plan.
pub fn balance(members: Vec<GroupMember>, topics: &BTreeMap<String, Vec<i32>>) -> Plan {
    let mut balancer = Balancer::new(members, topics);

    // Figure out what everybody was doing before this rebalance.
    balancer.parse_member_metadata();
    balancer.init_candidates();

    // Strand the partitions nobody wants anymore, hand out everything
    // unowned, then move partitions from the loaded to the idle.
    balancer.assign_unassigned();
    balancer.balance();

    balancer.into_plan()
}

struct Balancer<'a> {
    /// Members in play, keyed by id. The sorted keys fix every iteration
    /// order a plain member list would leave to chance.
    members: BTreeMap<String, GroupMember>,

    /// The topics and partitions the caller knows of, used to filter
    /// claims and subscriptions for topics this client has no metadata
    /// for.
    topics: &'a BTreeMap<String, Vec<i32>>,

    /// The plan being built. Initialized from the user data of each
    /// member, then partitions are moved around or newly assigned.
    plan: BTreeMap<String, Vec<TopicPartition>>,

    /// Members ordered by how many partitions they hold. Kept in lock-step
    /// with `plan` through the remove-mutate-reinsert discipline.
    plan_by_load: LoadHeap,

    /// Whether this is the first assignment for the group, true if no
    /// member carried decodable prior data.
    is_fresh_assignment: bool,

    /// Whether every participating partition could go to the same set of
    /// members. Makes the balance check trivial when true.
    are_subscriptions_identical: bool,

    /// The member currently holding each assigned partition, so the
    /// rebalancer knows whom it would steal from.
    partition_owner: HashMap<TopicPartition, String>,

    /// Every partition each member could consume. Built once, never
    /// modified.
    member_candidates: BTreeMap<String, BTreeSet<TopicPartition>>,

    /// Every member that could consume each partition. Built once, never
    /// modified. Partitions nobody subscribes to have no entry and take no
    /// part in balancing.
    partition_candidates: BTreeMap<TopicPartition, BTreeSet<String>>,
}

#[derive(Debug, Clone)]
struct StealCandidate {
    owner: String,
    partition: TopicPartition,
}

impl<'a> Balancer<'a> {
    fn new(members: Vec<GroupMember>, topics: &'a BTreeMap<String, Vec<i32>>) -> Self {
        Self {
            members: members
                .into_iter()
                .map(|member| (member.id.clone(), member))
                .collect(),
            topics,
            plan: BTreeMap::new(),
            plan_by_load: LoadHeap::default(),
            is_fresh_assignment: false,
            are_subscriptions_identical: false,
            partition_owner: HashMap::new(),
            member_candidates: BTreeMap::new(),
            partition_candidates: BTreeMap::new(),
        }
    }

    /// Rebuilds the prior plan from the user data every member sent along
    /// with its join.
    ///
    /// Each claimed partition goes to the claimant with the highest
    /// generation. A partition claimed twice within one generation is a
    /// stale rejoin (KIP-341); the claimant with the greater id is dropped.
    fn parse_member_metadata(&mut self) {
        struct Claim {
            member: String,
            generation: i32,
        }

        let mut claims: BTreeMap<TopicPartition, Vec<Claim>> = BTreeMap::new();

        for member in self.members.values() {
            let (prior, generation) = decode_user_data(member.version, &member.user_data);
            for partition in prior {
                let claimants = claims.entry(partition).or_default();
                if claimants.iter().any(|claim| claim.generation == generation) {
                    continue;
                }
                claimants.push(Claim {
                    member: member.id.clone(),
                    generation,
                });
            }
        }

        for (partition, mut claimants) in claims {
            claimants.sort_by(|a, b| b.generation.cmp(&a.generation));
            let winner = claimants.swap_remove(0).member;
            self.plan.entry(winner).or_default().push(partition);
        }

        self.is_fresh_assignment = self.plan.is_empty();
    }

    /// Builds both sides of the subscription graph, restricted to topics
    /// the caller knows of.
    ///
    /// Members without prior data are added to the plan here, consuming
    /// nothing.
    fn init_candidates(&mut self) {
        for member in self.members.values() {
            for topic in &member.topics {
                let Some(partitions) = self.topics.get(topic) else {
                    continue;
                };
                for &partition in partitions {
                    let partition = TopicPartition {
                        topic: topic.clone(),
                        partition,
                    };
                    self.member_candidates
                        .entry(member.id.clone())
                        .or_default()
                        .insert(partition.clone());
                    self.partition_candidates
                        .entry(partition)
                        .or_default()
                        .insert(member.id.clone());
                }
            }

            self.plan.entry(member.id.clone()).or_default();
        }

        let mut candidate_sets = self.partition_candidates.values();
        self.are_subscriptions_identical = match candidate_sets.next() {
            None => true,
            Some(first) => candidate_sets.all(|set| set == first),
        };
    }

    /// Sweeps the prior plan for partitions whose owner no longer wants
    /// them or that no longer exist, then places everything unowned on the
    /// least loaded member able to take it.
    fn assign_unassigned(&mut self) {
        let mut unvisited: BTreeSet<TopicPartition> =
            self.partition_candidates.keys().cloned().collect();

        let mut unassigned = Vec::new();
        for (member, partitions) in &mut self.plan {
            let subscribed = &self.members[member].topics;
            for partition in std::mem::take(partitions) {
                // The partition fell out of the subscription graph, likely
                // because the topic was deleted. The prior claim dies with
                // it.
                if !self.partition_candidates.contains_key(&partition) {
                    continue;
                }

                unvisited.remove(&partition);
                self.partition_owner
                    .insert(partition.clone(), member.clone());

                if subscribed.contains(&partition.topic) {
                    partitions.push(partition);
                } else {
                    // The member narrowed its interest since the last
                    // generation.
                    unassigned.push(partition);
                }
            }
        }
        unassigned.extend(unvisited);

        // The sweep above changed list lengths, so the load index is built
        // only now, keyed on what the lists actually hold.
        for (member, partitions) in &self.plan {
            self.plan_by_load.insert(partitions.len(), member);
        }

        for partition in unassigned {
            self.assign_partition(partition);
        }
    }

    /// Hands one unassigned partition to the least loaded member that can
    /// consume it.
    fn assign_partition(&mut self, unassigned: TopicPartition) {
        let target = self
            .plan_by_load
            .ascend()
            .find(|(_, member)| {
                self.member_candidates
                    .get(*member)
                    .is_some_and(|potentials| potentials.contains(&unassigned))
            })
            .map(|(count, member)| (count, member.to_string()));

        let Some((count, member)) = target else {
            return;
        };

        self.plan_by_load.remove(count, &member);
        let partitions = self
            .plan
            .get_mut(&member)
            .expect("every member has a plan entry");
        partitions.push(unassigned.clone());
        self.plan_by_load.insert(partitions.len(), &member);

        self.partition_owner.insert(unassigned, member);
    }

    /// Runs the reassignment loop, then keeps whichever of the two plans
    /// scores better: the rebalancer is greedy and an adversarial
    /// subscription graph can leave it with an equal-or-worse plan, in
    /// which case the stickier pre-balance plan wins.
    fn balance(&mut self) {
        let pre_balance_plan = self.plan.clone();
        let starting_plan: BTreeMap<String, BTreeSet<TopicPartition>> = self
            .plan
            .iter()
            .map(|(member, partitions)| (member.clone(), partitions.iter().cloned().collect()))
            .collect();

        let did_reassign = self.do_reassigning(&starting_plan);

        if !self.is_fresh_assignment && did_reassign {
            let before = balance_score(&pre_balance_plan);
            let after = balance_score(&self.plan);
            if after >= before {
                debug!(
                    message = "rebalance did not improve the balance score, keeping the prior plan",
                    before, after,
                );
                self.plan = pre_balance_plan;
            }
        }
    }

    /// Moves partitions from more loaded members to less loaded ones until
    /// the plan is balanced or no move is possible.
    ///
    /// Each round walks members from least loaded upwards and performs at
    /// most one steal. A member that finds nothing to steal is frozen: it
    /// is the least loaded member still in play, so nothing will steal
    /// from it either, and it never needs another look. `cyclers` records
    /// every member a partition has landed on during this rebalance; a
    /// partition arriving at a member that already held it proves a steal
    /// cycle, and the member it ends on freezes. Cycles only form among
    /// members within one partition of each other (only the current
    /// minimum steals, and only from someone strictly above it), so
    /// freezing on revisit is enough for termination. The steal-back
    /// preference below keeps those cycles at two hops, which is what
    /// preserves stickiness.
    fn do_reassigning(
        &mut self,
        starting_plan: &BTreeMap<String, BTreeSet<TopicPartition>>,
    ) -> bool {
        let mut cyclers: HashMap<TopicPartition, BTreeSet<String>> = HashMap::new();
        let mut frozen: BTreeSet<String> = BTreeSet::new();
        let mut did_reassign = false;
        let mut modified = true;

        while modified {
            if self.is_balanced() {
                return did_reassign;
            }
            modified = false;

            // The walk only mutates the heap on the move that breaks out
            // of it, so snapshotting the ascend order per round is sound.
            let ascend: Vec<String> = self
                .plan_by_load
                .ascend()
                .map(|(_, member)| member.to_string())
                .collect();

            for member in ascend {
                if frozen.contains(&member) {
                    continue;
                }

                let candidates = self.steal_candidates(&member, &frozen);
                if candidates.is_empty() {
                    trace!(message = "nothing to steal, freezing member", member = %member);
                    frozen.insert(member);
                    continue;
                }

                let steal = self.choose_steal(&member, &candidates, starting_plan);

                trace!(
                    message = "stealing partition",
                    member = %member,
                    owner = %steal.owner,
                    topic = %steal.partition.topic,
                    partition = steal.partition.partition,
                );

                let cycle = cyclers.entry(steal.partition.clone()).or_default();
                if cycle.contains(&member) {
                    // The partition came back to a member that held it
                    // earlier in this rebalance.
                    trace!(message = "steal cycle detected, freezing member", member = %member);
                    frozen.insert(member.clone());
                }
                cycle.insert(member.clone());
                cycle.insert(steal.owner.clone());

                self.reassign_partition(&steal.partition, &steal.owner, &member);
                did_reassign = true;
                modified = true;
                break;
            }
        }

        did_reassign
    }

    /// Collects the partitions `member` could steal, restricted to owners
    /// holding strictly more than it and tied for the most held.
    fn steal_candidates(&self, member: &str, frozen: &BTreeSet<String>) -> Vec<StealCandidate> {
        let mut candidates: Vec<StealCandidate> = Vec::new();

        let Some(potentials) = self.member_candidates.get(member) else {
            return candidates;
        };
        let my_count = self.plan[member].len();

        let mut most_other = 0;
        for partition in potentials {
            let Some(owner) = self.partition_owner.get(partition) else {
                continue;
            };
            if owner.as_str() == member || frozen.contains(owner) {
                continue;
            }

            let other_count = self.plan[owner].len();
            if my_count < other_count && other_count >= most_other {
                if most_other > 0 && most_other < other_count {
                    // Everything collected so far came from lighter owners.
                    candidates.clear();
                }
                most_other = other_count;
                candidates.push(StealCandidate {
                    owner: owner.clone(),
                    partition: partition.clone(),
                });
            }
        }

        candidates
    }

    /// Picks which candidate to steal.
    ///
    /// A partition the member held before the rebalance always wins, that
    /// is the steal-back keeping cycles at two hops. Failing that, the
    /// lowest-id owner is the victim and loses its candidate partition
    /// nearest the tail of its list.
    fn choose_steal(
        &self,
        member: &str,
        candidates: &[StealCandidate],
        starting_plan: &BTreeMap<String, BTreeSet<TopicPartition>>,
    ) -> StealCandidate {
        if let Some(starting) = starting_plan.get(member) {
            if let Some(candidate) = candidates
                .iter()
                .find(|candidate| starting.contains(&candidate.partition))
            {
                return candidate.clone();
            }
        }

        let victim = candidates
            .iter()
            .map(|candidate| candidate.owner.as_str())
            .min()
            .expect("choose_steal called with candidates");
        let partitions = &self.plan[victim];
        candidates
            .iter()
            .filter(|candidate| candidate.owner == victim)
            .max_by_key(|candidate| {
                partitions
                    .iter()
                    .position(|partition| *partition == candidate.partition)
            })
            .expect("victim owns at least one candidate")
            .clone()
    }

    /// Moves a partition from `src` to `dst`, keeping the owner map and
    /// the load index in lock-step with the plan.
    fn reassign_partition(&mut self, partition: &TopicPartition, src: &str, dst: &str) {
        let src_count = self.plan[src].len();
        let dst_count = self.plan[dst].len();

        // Both entries leave the index before the lengths they key on
        // change.
        self.plan_by_load.remove(src_count, src);
        self.plan_by_load.remove(dst_count, dst);

        let src_partitions = self.plan.get_mut(src).expect("source member has a plan entry");
        if let Some(idx) = src_partitions
            .iter()
            .position(|candidate| candidate == partition)
        {
            src_partitions.swap_remove(idx);
        }
        self.plan
            .get_mut(dst)
            .expect("destination member has a plan entry")
            .push(partition.clone());

        self.plan_by_load.insert(src_count - 1, src);
        self.plan_by_load.insert(dst_count + 1, dst);

        self.partition_owner.insert(partition.clone(), dst.to_string());
    }

    /// Whether no further reassignment could improve the plan.
    fn is_balanced(&self) -> bool {
        // The plan is empty if no member subscribes to anything the caller
        // knows of.
        let (Some((min, _)), Some((max, _))) = (self.plan_by_load.min(), self.plan_by_load.max())
        else {
            return true;
        };
        if min + 1 >= max {
            return true;
        }
        // With identical subscriptions a delta above one is always fixable,
        // so the expensive scan below is never needed.
        if self.are_subscriptions_identical {
            return false;
        }

        // Unbalanced if any member could consume a partition sitting on a
        // member with strictly more partitions.
        for (count, member) in self.plan_by_load.ascend() {
            let Some(potentials) = self.member_candidates.get(member) else {
                continue;
            };
            if count == potentials.len() {
                continue;
            }

            for partition in potentials {
                let Some(owner) = self.partition_owner.get(partition) else {
                    continue;
                };
                if owner.as_str() == member {
                    continue;
                }
                if count < self.plan[owner].len() {
                    return false;
                }
            }
        }

        true
    }

    /// Projects the internal plan into its public form.
    fn into_plan(self) -> Plan {
        let mut plan = Plan::new();
        for (member, partitions) in self.plan {
            let topics = plan.entry(member).or_default();
            for partition in partitions {
                topics
                    .entry(partition.topic)
                    .or_default()
                    .push(partition.partition);
            }
        }
        plan
    }
}

/// Sums the partition-count delta over every unordered pair of members.
/// The lower the aggregate delta, the better balanced the plan.
fn balance_score(plan: &BTreeMap<String, Vec<TopicPartition>>) -> usize {
    let sizes: Vec<usize> = plan.values().map(Vec::len).collect();

    let mut score = 0;
    for (idx, size) in sizes.iter().enumerate() {
        for other in &sizes[idx + 1..] {
            score += size.abs_diff(*other);
        }
    }
    score
}

/// Returns the partitions a member was consuming and the generation it was
/// handed them in.
///
/// Any parse failure, and any version this client does not understand,
/// degrades to no history: the member joins as if it were new. Malformed
/// user data from a peer is never an error here.
fn decode_user_data(version: i16, user_data: &[u8]) -> (Vec<TopicPartition>, i32) {
    let mut cursor = Cursor::new(user_data);

    let (assignment, generation) = match version {
        0 => match StickyMemberMetadataV0::read(&mut cursor) {
            Ok(metadata) => (metadata.current_assignment, DEFAULT_GENERATION),
            Err(_) => return (vec![], DEFAULT_GENERATION),
        },
        1 => match StickyMemberMetadataV1::read(&mut cursor) {
            Ok(metadata) => (metadata.current_assignment, metadata.generation),
            Err(_) => return (vec![], DEFAULT_GENERATION),
        },
        _ => return (vec![], DEFAULT_GENERATION),
    };

    let mut prior = Vec::new();
    for block in assignment {
        for partition in block.partitions {
            prior.push(TopicPartition {
                topic: block.topic.clone(),
                partition,
            });
        }
    }

    (prior, generation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::{StickyMemberMetadataV1, TopicAssignment};
    use crate::protocol::traits::WriteType;

    fn member(id: &str, topics: &[&str]) -> GroupMember {
        GroupMember {
            id: id.to_string(),
            version: 0,
            topics: topics.iter().map(|topic| topic.to_string()).collect(),
            user_data: vec![],
        }
    }

    fn member_with_prior(
        id: &str,
        topics: &[&str],
        prior: &[(&str, &[i32])],
        generation: i32,
    ) -> GroupMember {
        let metadata = StickyMemberMetadataV1 {
            current_assignment: prior
                .iter()
                .map(|(topic, partitions)| TopicAssignment {
                    topic: topic.to_string(),
                    partitions: partitions.to_vec(),
                })
                .collect(),
            generation,
        };
        let mut user_data = Vec::new();
        metadata.write(&mut user_data).expect("encode user data");

        GroupMember {
            id: id.to_string(),
            version: 1,
            topics: topics.iter().map(|topic| topic.to_string()).collect(),
            user_data,
        }
    }

    fn topic_map(topics: &[(&str, &[i32])]) -> BTreeMap<String, Vec<i32>> {
        topics
            .iter()
            .map(|(topic, partitions)| (topic.to_string(), partitions.to_vec()))
            .collect()
    }

    fn plan_of(want: &[(&str, &[(&str, &[i32])])]) -> Plan {
        want.iter()
            .map(|(member, topics)| {
                (
                    member.to_string(),
                    topics
                        .iter()
                        .map(|(topic, partitions)| (topic.to_string(), partitions.to_vec()))
                        .collect(),
                )
            })
            .collect()
    }

    fn tp(topic: &str, partition: i32) -> TopicPartition {
        TopicPartition {
            topic: topic.to_string(),
            partition,
        }
    }

    #[test]
    fn decode_user_data_v0_has_default_generation() {
        let mut user_data = Vec::new();
        StickyMemberMetadataV0 {
            current_assignment: vec![TopicAssignment {
                topic: "t".to_string(),
                partitions: vec![0, 1],
            }],
        }
        .write(&mut user_data)
        .unwrap();

        let (prior, generation) = decode_user_data(0, &user_data);
        assert_eq!(prior, vec![tp("t", 0), tp("t", 1)]);
        assert_eq!(generation, DEFAULT_GENERATION);
    }

    #[test]
    fn decode_user_data_v1_carries_generation() {
        let mut user_data = Vec::new();
        StickyMemberMetadataV1 {
            current_assignment: vec![TopicAssignment {
                topic: "t".to_string(),
                partitions: vec![2],
            }],
            generation: 7,
        }
        .write(&mut user_data)
        .unwrap();

        let (prior, generation) = decode_user_data(1, &user_data);
        assert_eq!(prior, vec![tp("t", 2)]);
        assert_eq!(generation, 7);
    }

    #[test]
    fn decode_user_data_degrades_to_no_history() {
        // truncated, garbage, empty with a version that demands content,
        // and an unknown version
        for (version, user_data) in [
            (1, vec![0u8, 0, 0, 1, 0, 1]),
            (0, vec![0xff, 0x00, 0x01]),
            (1, vec![]),
            (2, vec![0, 0, 0, 0]),
        ] {
            let (prior, generation) = decode_user_data(version, &user_data);
            assert_eq!(prior, vec![]);
            assert_eq!(generation, DEFAULT_GENERATION);
        }
    }

    #[test]
    fn parse_member_metadata_highest_generation_wins() {
        let topics = topic_map(&[("t", &[0, 1])]);
        let members = vec![
            member_with_prior("a", &["t"], &[("t", &[0])], 3),
            member_with_prior("b", &["t"], &[("t", &[0])], 7),
        ];

        let mut balancer = Balancer::new(members, &topics);
        balancer.parse_member_metadata();

        assert_eq!(balancer.plan.len(), 1);
        assert_eq!(balancer.plan["b"], vec![tp("t", 0)]);
        assert!(!balancer.is_fresh_assignment);
    }

    #[test]
    fn parse_member_metadata_drops_same_generation_duplicate() {
        let topics = topic_map(&[("t", &[0])]);
        // both claim t-0 at generation 5; the lower id is encountered
        // first and keeps it
        let members = vec![
            member_with_prior("b", &["t"], &[("t", &[0])], 5),
            member_with_prior("a", &["t"], &[("t", &[0])], 5),
        ];

        let mut balancer = Balancer::new(members, &topics);
        balancer.parse_member_metadata();

        assert_eq!(balancer.plan["a"], vec![tp("t", 0)]);
        assert!(!balancer.plan.contains_key("b"));
    }

    #[test]
    fn parse_member_metadata_ignores_repeated_partition_in_one_blob() {
        let topics = topic_map(&[("t", &[0])]);
        let members = vec![member_with_prior("a", &["t"], &[("t", &[0, 0])], 5)];

        let mut balancer = Balancer::new(members, &topics);
        balancer.parse_member_metadata();

        assert_eq!(balancer.plan["a"], vec![tp("t", 0)]);
    }

    #[test]
    fn parse_member_metadata_empty_group_is_fresh() {
        let topics = topic_map(&[("t", &[0])]);
        let members = vec![member("a", &["t"]), member("b", &["t"])];

        let mut balancer = Balancer::new(members, &topics);
        balancer.parse_member_metadata();

        assert!(balancer.is_fresh_assignment);
    }

    #[test]
    fn init_candidates_subscription_flag() {
        for (members, identical) in [
            (vec![member("a", &["t"]), member("b", &["t"])], true),
            (vec![member("a", &["t", "u"]), member("b", &["t"])], false),
            // no partitions at all leaves the flag set
            (vec![member("a", &["missing"])], true),
        ] {
            let topics = topic_map(&[("t", &[0, 1]), ("u", &[0])]);
            let mut balancer = Balancer::new(members, &topics);
            balancer.parse_member_metadata();
            balancer.init_candidates();

            assert_eq!(balancer.are_subscriptions_identical, identical);
        }
    }

    #[test]
    fn init_candidates_mirrors_both_maps() {
        let topics = topic_map(&[("t", &[0, 1]), ("u", &[0])]);
        let members = vec![member("a", &["t", "u"]), member("b", &["t"])];

        let mut balancer = Balancer::new(members, &topics);
        balancer.parse_member_metadata();
        balancer.init_candidates();

        for (member, partitions) in &balancer.member_candidates {
            for partition in partitions {
                assert!(balancer.partition_candidates[partition].contains(member));
            }
        }
        for (partition, members) in &balancer.partition_candidates {
            for member in members {
                assert!(balancer.member_candidates[member].contains(partition));
            }
        }
        assert_eq!(balancer.member_candidates["a"].len(), 3);
        assert_eq!(balancer.member_candidates["b"].len(), 2);
    }

    #[test]
    fn balance_score_sums_pairwise_deltas() {
        let mut plan: BTreeMap<String, Vec<TopicPartition>> = BTreeMap::new();
        plan.insert("a".to_string(), vec![tp("t", 0), tp("t", 1)]);
        plan.insert("b".to_string(), vec![tp("t", 2)]);
        plan.insert("c".to_string(), vec![]);

        // |2-1| + |2-0| + |1-0|
        assert_eq!(balance_score(&plan), 4);
    }

    #[test]
    fn balance_empty_members() {
        let topics = topic_map(&[("t", &[0, 1])]);
        assert_eq!(balance(vec![], &topics), Plan::new());
    }

    #[test]
    fn balance_unknown_topic_gives_empty_assignment() {
        let topics = topic_map(&[("t", &[0])]);
        let got = balance(vec![member("a", &["missing"])], &topics);

        assert_eq!(got, plan_of(&[("a", &[])]));
    }

    #[test]
    fn balance_tie_break_victim_is_lowest_id() {
        // a and b tie at two partitions each on disjoint topics; the
        // newcomer holds no history, so the lowest-id owner loses the
        // partition at the tail of its list
        let topics = topic_map(&[("x", &[0, 1]), ("y", &[0, 1])]);
        let members = vec![
            member_with_prior("a", &["x", "y"], &[("x", &[0, 1])], 5),
            member_with_prior("b", &["x", "y"], &[("y", &[0, 1])], 5),
            member("c", &["x", "y"]),
        ];

        let got = balance(members, &topics);
        assert_eq!(
            got,
            plan_of(&[
                ("a", &[("x", &[0])]),
                ("b", &[("y", &[0, 1])]),
                ("c", &[("x", &[1])]),
            ])
        );
    }

    #[test]
    fn balance_steal_cycle_terminates_and_sticks() {
        // The classic steal cycle: a, b and c all subscribe to t and sit
        // at 2/2/1 partitions; d and e keep the group unbalanced from the
        // side so the reassignment loop keeps running. Every steal is
        // stolen straight back by its prior owner, members freeze one by
        // one, and the score gate restores the original plan.
        let topics = topic_map(&[("t", &[1, 2, 3, 4, 5]), ("u", &[7, 8, 9, 10, 11, 12])]);
        let members = vec![
            member_with_prior("a", &["t"], &[("t", &[1, 2])], 5),
            member_with_prior("b", &["t"], &[("t", &[3, 4])], 5),
            member_with_prior("c", &["t"], &[("t", &[5])], 5),
            member_with_prior("d", &["u"], &[("u", &[7, 8, 9])], 5),
            member_with_prior("e", &["u"], &[("u", &[10, 11, 12])], 5),
        ];

        let got = balance(members, &topics);
        assert_eq!(
            got,
            plan_of(&[
                ("a", &[("t", &[1, 2])]),
                ("b", &[("t", &[3, 4])]),
                ("c", &[("t", &[5])]),
                ("d", &[("u", &[7, 8, 9])]),
                ("e", &[("u", &[10, 11, 12])]),
            ])
        );
    }

    #[test]
    fn balance_is_member_order_independent() {
        let topics = topic_map(&[("t", &[0, 1, 2, 3, 4])]);
        let forward = vec![
            member("a", &["t"]),
            member("b", &["t"]),
            member("c", &["t"]),
        ];
        let reverse = vec![
            member("c", &["t"]),
            member("b", &["t"]),
            member("a", &["t"]),
        ];

        assert_eq!(balance(forward, &topics), balance(reverse, &topics));
    }
}
