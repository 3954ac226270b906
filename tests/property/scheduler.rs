// tests/property/scheduler.rs

use std::time::Duration;

use proptest::prelude::*;

use pmdispatch::fs::mock::MockFileSystem;
use pmdispatch::job::JobDescriptor;
use pmdispatch::sched::JobState;
use pmdispatch::types::ExecutionPolicy;
use pmdispatch_test_utils::builders::{SchedulerBuilder, job};
use pmdispatch_test_utils::fake_provider::{FakeBehaviour, FakeProvider};

#[derive(Debug, Clone)]
struct JobShape {
    privileged: bool,
    priority: i32,
    exit_code: i32,
    delay_ms: u64,
}

fn job_shape() -> impl Strategy<Value = JobShape> {
    (any::<bool>(), 0..3i32, prop_oneof![Just(0), Just(1)], 0..20u64).prop_map(
        |(privileged, priority, exit_code, delay_ms)| JobShape {
            privileged,
            priority,
            exit_code,
            delay_ms,
        },
    )
}

fn policy() -> impl Strategy<Value = ExecutionPolicy> {
    prop_oneof![Just(ExecutionPolicy::Parallel), Just(ExecutionPolicy::Sequential)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_dispatch_invariants(
        shapes in proptest::collection::vec(job_shape(), 1..8),
        policy in policy(),
    ) {
        let fs = MockFileSystem::new();
        let mut provider = FakeProvider::new(fs.clone());
        let mut jobs: Vec<JobDescriptor> = Vec::with_capacity(shapes.len());
        for (i, shape) in shapes.iter().enumerate() {
            let id = format!("job{i}");
            provider = provider.with_job(
                &id,
                FakeBehaviour::default()
                    .exit_code(shape.exit_code)
                    .after(Duration::from_millis(shape.delay_ms)),
            );
            jobs.push(job(&id).privileged(shape.privileged).with_priority(shape.priority));
        }
        let mut scheduler = SchedulerBuilder::new(fs.clone())
            .policy(policy)
            .poll_interval(Duration::from_millis(2))
            .build(provider);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        let outcomes = runtime.block_on(scheduler.dispatch(&jobs));

        // One outcome per job, in request order.
        prop_assert_eq!(outcomes.len(), jobs.len());
        for (outcome, (descriptor, shape)) in outcomes.iter().zip(jobs.iter().zip(shapes.iter())) {
            prop_assert_eq!(&outcome.id, &descriptor.id);
            prop_assert_eq!(outcome.success, shape.exit_code == 0, "{:?}", outcome);
        }

        let trace = scheduler.trace();
        let privileged: Vec<&JobDescriptor> = jobs.iter().filter(|j| j.requires_privilege).collect();
        let unprivileged: Vec<&JobDescriptor> = jobs.iter().filter(|j| !j.requires_privilege).collect();

        // Every privileged job is finished before any unprivileged job starts.
        for p in &privileged {
            let done = trace.done_position(&p.id);
            prop_assert!(done.is_some(), "{} never finished", p.id);
            for u in &unprivileged {
                let spawning = trace.position(&u.id, JobState::Spawning);
                prop_assert!(spawning.is_some(), "{} never spawned", u.id);
                prop_assert!(done < spawning, "{} spawned before {} finished", u.id, p.id);
            }
        }

        // Privileged jobs start by priority, ties keep request order.
        let mut expected: Vec<&JobDescriptor> = privileged.clone();
        expected.sort_by_key(|j| j.priority);
        let expected_ids: Vec<String> = expected.iter().map(|j| j.id.clone()).collect();
        let spawned_privileged: Vec<String> = trace
            .spawn_order()
            .into_iter()
            .filter(|id| privileged.iter().any(|p| &p.id == id))
            .collect();
        prop_assert_eq!(spawned_privileged, expected_ids);

        // Nothing is left running.
        prop_assert_eq!(trace.completion_order().len(), jobs.len());
    }
}
