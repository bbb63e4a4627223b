// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps the persisted config document's strategy enums onto the engine
//! crate's own (runtime-only) strategy enums. Two separate types exist
//! because `poppo-core::config` is the serde schema (kebab-case on the
//! wire) and `poppo-engine`'s enums back a `Mutex<Box<dyn Strategy>>`
//! dispatch table that has no reason to depend on `poppo-config`.

pub fn scheduling_kind_from_config(kind: poppo_core::config::SchedulingStrategyKind) -> poppo_engine::SchedulingStrategyKind {
    use poppo_core::config::SchedulingStrategyKind as Cfg;
    use poppo_engine::SchedulingStrategyKind as Eng;
    match kind {
        Cfg::RoundRobin => Eng::RoundRobin,
        Cfg::WeightedRoundRobin => Eng::WeightedRoundRobin,
        Cfg::Priority => Eng::Priority,
        Cfg::FairShare => Eng::FairShare,
        Cfg::DeadlineAware => Eng::DeadlineAware,
    }
}

pub fn selection_kind_from_config(kind: poppo_core::config::SelectionStrategyKind) -> poppo_engine::SelectionStrategyKind {
    use poppo_core::config::SelectionStrategyKind as Cfg;
    use poppo_engine::SelectionStrategyKind as Eng;
    match kind {
        Cfg::RoundRobin => Eng::RoundRobin,
        Cfg::LeastConnections => Eng::LeastConnections,
        Cfg::WeightedRoundRobin => Eng::WeightedRoundRobin,
        Cfg::ResponseTime => Eng::ResponseTime,
        Cfg::Random => Eng::Random,
    }
}

#[cfg(test)]
#[path = "convert_tests.rs"]
mod tests;
