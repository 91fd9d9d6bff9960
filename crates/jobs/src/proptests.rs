use proptest::prelude::*;

use crate::{JobError, JobRegistry, JobState, JobStatus};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    /// Property: any description is listed verbatim, before the work runs.
    #[test]
    fn created_jobs_are_visible_before_they_run(
        descriptions in prop::collection::vec(".{0,40}", 1..8)
    ) {
        let rt = runtime();
        rt.block_on(async {
            let registry: JobRegistry<usize> = JobRegistry::new();
            let jobs: Vec<_> = descriptions
                .iter()
                .enumerate()
                .map(|(i, d)| registry.create_job(d.clone(), move |_| async move { Ok(i) }))
                .collect();

            let listed = registry.jobs();
            prop_assert_eq!(listed.len(), descriptions.len());
            for (job, description) in listed.iter().zip(&descriptions) {
                prop_assert_eq!(job.description(), description.as_str());
                prop_assert_eq!(job.status(), JobStatus::Running);
            }

            for (i, job) in jobs.iter().enumerate() {
                prop_assert_eq!(job.wait().await, JobState::Completed(i));
            }
            Ok(())
        })?;
    }

    /// Property: once a job is observed terminal, every later read agrees.
    #[test]
    fn terminal_status_is_stable(fail in any::<bool>(), reads in 1usize..20) {
        let rt = runtime();
        rt.block_on(async {
            let registry: JobRegistry<()> = JobRegistry::new();
            let job = registry.create_job("flip", move |_| async move {
                if fail { Err(JobError::failed("flip")) } else { Ok(()) }
            });

            let first = job.wait().await.status();
            for _ in 0..reads {
                tokio::task::yield_now().await;
                prop_assert_eq!(job.status(), first);
                prop_assert_eq!(registry.try_peek_job(job.id()).map(|j| j.status()), Some(first));
            }
            Ok(())
        })?;
    }
}
