// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Severity at or above which an observation is a crisis regardless of its wording
pub const DEFAULT_HIGH_SEVERITY_THRESHOLD: u8 = 8;
/// Lowest value of the observation severity scale
pub const MIN_SEVERITY: u8 = 1;
/// Highest value of the observation severity scale
pub const MAX_SEVERITY: u8 = 10;
/// Pause before each protocol step
pub const DEFAULT_STEP_DELAY_MS: u64 = 500;
/// How long the demo waits for request replies
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 2_000;

/// Risk phrases that mark an observation as a suicide-risk crisis
pub const DEFAULT_CRISIS_KEYWORDS: &[&str] = &[
    "suicidal",
    "suicide",
    "kill myself",
    "end my life",
    "hopeless",
    "cannot go on",
    "self-harm",
    "hurt myself",
];

/// Remediation protocols keyed by category
pub const DEFAULT_PROTOCOLS: &[(&str, &[&str])] = &[
    (
        "suicide_risk",
        &[
            "Immediately alert on-call clinician",
            "Assess immediate danger and consider emergency services",
            "Provide crisis hotline number",
            "Schedule urgent follow-up within 24 hours",
        ],
    ),
    (
        "self_harm_risk",
        &[
            "Alert treating clinician",
            "Provide resources for coping strategies",
            "Schedule follow-up within 48 hours",
            "Consider safety planning",
        ],
    ),
    (
        "severe_depression",
        &[
            "Alert treating clinician",
            "Assess for suicidal ideation",
            "Provide resources for immediate support",
            "Schedule follow-up within 72 hours",
        ],
    ),
    (
        "psychosis",
        &[
            "Immediately alert on-call clinician",
            "Assess for safety risks",
            "Consider emergency psychiatric evaluation",
            "Provide support resources to patient and family",
        ],
    ),
];
