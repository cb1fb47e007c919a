/*!
 * Tests for subtitle re-timing across language pairs
 */

use subcontext::app_config::TranslationTier;
use subcontext::subtitle_processor::SubtitleCue;
use subcontext::translation::timing::{RATIO_RANGE, TimingAdjuster, adjust_cue, duration_bounds, word_count};

const SAMPLES: &[(&str, &str)] = &[
    ("Hi", "Ahoj"),
    ("Where were you last night?", "Kde jsi byl včera v noci?"),
    ("I told you, I don't know anything about it.", "Řekl jsem ti, že o tom nic nevím, vůbec nic, přísahám."),
    ("No.", "Ne."),
    ("[DOOR SLAMS]", "[BOUCHNUTÍ DVEŘÍ]"),
    (
        "We have to get out of here before they come back with the others.",
        "Musíme odsud zmizet dřív, než se vrátí s ostatními a zavřou nás.",
    ),
];

/// Test that the "Hi" to "Ahoj" case lands on the 800 ms floor
#[test]
fn test_adjustCue_hiToAhoj_shouldExtendToFloor() {
    let cue = SubtitleCue::new(4, 60_000, 60_500, "Hi").with_text("Ahoj");

    let adjusted = adjust_cue(&cue, "Hi", "en", "cs");

    assert_eq!(adjusted.start_time_ms, 60_000);
    assert_eq!(adjusted.end_time_ms, 60_800);
    assert_eq!(adjusted.index, 4);
    assert_eq!(adjusted.original_text(), "Hi");
}

/// Test that adjusted durations stay inside the word-based bounds
#[test]
fn test_adjust_acrossSamples_shouldRespectBoundsAndKeepStart() {
    let adjuster = TimingAdjuster::new("en", "cs");

    for &(original, translated) in SAMPLES {
        for duration in [300u64, 1200, 4000, 15_000] {
            let cue = SubtitleCue::new(1, 1000, 1000 + duration, original).with_text(translated);
            let adjusted = adjuster.adjust(&cue);

            assert_eq!(adjusted.start_time_ms, cue.start_time_ms);
            assert_eq!(adjusted.text, translated);

            if adjusted.end_time_ms != cue.end_time_ms {
                let (floor, ceiling) = duration_bounds(word_count(translated));
                let new_duration = adjusted.duration_ms();
                assert!(
                    (floor..=ceiling).contains(&new_duration),
                    "{:?} -> {}ms outside [{}, {}]",
                    translated,
                    new_duration,
                    floor,
                    ceiling
                );
            }
        }
    }
}

/// Test that ratios are clamped for every sample
#[test]
fn test_finalRatio_acrossSamples_shouldStayInRange() {
    for (source, target) in [("en", "cs"), ("cs", "en"), ("en", "ja"), ("de", "fi")] {
        let adjuster = TimingAdjuster::new(source, target);
        for &(original, translated) in SAMPLES {
            let ratio = adjuster.final_ratio(original, translated);
            assert!(ratio >= RATIO_RANGE.0 && ratio <= RATIO_RANGE.1);
        }
        let extreme = adjuster.final_ratio("a", &"word ".repeat(200));
        assert_eq!(extreme, RATIO_RANGE.1);
    }
}

/// Test that a translation with the same shape keeps its timing
#[test]
fn test_adjust_withSameLanguage_shouldKeepTiming() {
    let adjuster = TimingAdjuster::new("en", "en");
    let cue = SubtitleCue::new(1, 0, 2000, "See you tomorrow.").with_text("See you tomorow.");

    assert_eq!(adjuster.adjust(&cue).end_time_ms, 2000);
}

/// Test that untranslated cues are left alone
#[test]
fn test_adjust_withUntranslatedCue_shouldKeepTiming() {
    let adjuster = TimingAdjuster::new("en", "cs");
    let cue = SubtitleCue::new(1, 0, 300, "Where were you last night?");

    assert_eq!(adjuster.adjust(&cue), cue);
}

/// Test the bounded fast path for English premium jobs
#[test]
fn test_forJob_withEnglishPremium_shouldExtendByAtMost800ms() {
    let adjuster = TimingAdjuster::for_job("en", "cs", TranslationTier::Premium);
    assert!(adjuster.uses_fast_path());

    let cue = SubtitleCue::new(1, 0, 1000, "Go!").with_text(&"Utíkej pryč, honem, hned teď! ".repeat(4));
    let adjusted = adjuster.adjust(&cue);
    assert!(adjusted.end_time_ms > 1000);
    assert!(adjusted.end_time_ms <= 1800);

    let (all, changed) = adjuster.adjust_all(&[cue.clone(), SubtitleCue::new(2, 2000, 3000, "Hello")]);
    assert_eq!(all.len(), 2);
    assert_eq!(changed, 1);
}
