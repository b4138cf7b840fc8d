use sawtfeel_models::{Emotion, EmotionSegment};

/// Combines the textual and tonal predictions for one window.
///
/// Agreement boosts confidence: the shared label wins with
/// `min(1.0, avg(text, tone) * 1.2)`. Disagreement keeps the
/// higher-confidence label but pays a 20% penalty. With equal confidences
/// and different labels the tonal side wins. The 1.2/0.8 multipliers are
/// tuned constants; changing them needs a regression corpus.
pub fn fuse(
    text_emotion: Emotion,
    text_conf: f64,
    tone_emotion: Emotion,
    tone_conf: f64,
) -> (Emotion, f64) {
    if text_conf + tone_conf == 0.0 {
        return (Emotion::Neutral, 0.5);
    }

    if text_emotion == tone_emotion {
        let combined = ((text_conf + tone_conf) / 2.0 * 1.2).min(1.0);
        return (text_emotion, combined);
    }

    if text_conf > tone_conf {
        (text_emotion, text_conf * 0.8)
    } else {
        (tone_emotion, tone_conf * 0.8)
    }
}

/// File-level dominant emotion across a segment timeline.
///
/// Each segment contributes `duration * combined_confidence` to its label;
/// the label with the greatest total wins and the returned confidence is its
/// normalized share of the total weight. Ties go to the label encountered
/// first in segment order.
pub fn dominant_emotion(segments: &[EmotionSegment]) -> (Emotion, f64) {
    if segments.is_empty() {
        return (Emotion::Neutral, 0.5);
    }

    let mut totals: Vec<(Emotion, f64)> = Vec::new();
    let mut total_weight = 0.0;
    for segment in segments {
        let weight = segment.duration() * segment.combined_confidence;
        total_weight += weight;
        match totals
            .iter_mut()
            .find(|(e, _)| *e == segment.combined_emotion)
        {
            Some((_, w)) => *w += weight,
            None => totals.push((segment.combined_emotion, weight)),
        }
    }

    if total_weight == 0.0 {
        return (Emotion::Neutral, 0.5);
    }

    let mut best = totals[0];
    for entry in &totals[1..] {
        if entry.1 > best.1 {
            best = *entry;
        }
    }

    (best.0, best.1 / total_weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: f64, end: f64, emotion: Emotion, conf: f64) -> EmotionSegment {
        EmotionSegment::new(start, end, emotion, conf, emotion, conf, emotion, conf).unwrap()
    }

    #[test]
    fn agreement_boosts_and_caps() {
        let (emotion, conf) = fuse(Emotion::Joy, 0.8, Emotion::Joy, 0.7);
        assert_eq!(emotion, Emotion::Joy);
        assert!((conf - 0.9).abs() < 1e-9);

        let (_, capped) = fuse(Emotion::Joy, 1.0, Emotion::Joy, 0.9);
        assert!((capped - 1.0).abs() < 1e-9);
    }

    #[test]
    fn agreement_is_idempotent_in_the_label() {
        for emotion in Emotion::ALL {
            for conf in [0.0, 0.25, 0.5, 0.75, 1.0] {
                let (e, c) = fuse(emotion, conf, emotion, conf);
                if conf == 0.0 {
                    // Zero total confidence falls back to the neutral default.
                    assert_eq!((e, c), (Emotion::Neutral, 0.5));
                } else {
                    assert_eq!(e, emotion);
                    assert!((c - (conf * 1.2).min(1.0)).abs() < 1e-9);
                }
            }
        }
    }

    #[test]
    fn disagreement_never_exceeds_the_stronger_input() {
        let cases = [
            (Emotion::Anger, 0.9, Emotion::Joy, 0.4),
            (Emotion::Sadness, 0.3, Emotion::Fear, 0.8),
            (Emotion::Joy, 0.6, Emotion::Surprise, 0.6),
        ];
        for (e1, c1, e2, c2) in cases {
            let (_, conf) = fuse(e1, c1, e2, c2);
            assert!(conf <= f64::max(c1, c2));
        }
    }

    #[test]
    fn disagreement_picks_higher_confidence_side() {
        let (emotion, conf) = fuse(Emotion::Anger, 0.9, Emotion::Joy, 0.4);
        assert_eq!(emotion, Emotion::Anger);
        assert!((conf - 0.72).abs() < 1e-9);

        // Equal confidences with different labels resolve to the tonal side.
        let (emotion, _) = fuse(Emotion::Anger, 0.6, Emotion::Joy, 0.6);
        assert_eq!(emotion, Emotion::Joy);
    }

    #[test]
    fn zero_confidence_is_neutral() {
        assert_eq!(
            fuse(Emotion::Anger, 0.0, Emotion::Joy, 0.0),
            (Emotion::Neutral, 0.5)
        );
    }

    #[test]
    fn dominant_weighs_duration_and_confidence() {
        let segments = vec![
            seg(0.0, 4.0, Emotion::Sadness, 0.9), // weight 3.6
            seg(4.0, 6.0, Emotion::Joy, 0.8),     // weight 1.6
            seg(6.0, 8.0, Emotion::Joy, 0.7),     // weight 1.4
        ];
        let (emotion, conf) = dominant_emotion(&segments);
        assert_eq!(emotion, Emotion::Sadness);
        assert!((conf - 3.6 / 6.6).abs() < 1e-9);
    }

    #[test]
    fn dominant_tie_goes_to_first_encountered() {
        let segments = vec![
            seg(0.0, 2.0, Emotion::Joy, 0.5),
            seg(2.0, 4.0, Emotion::Anger, 0.5),
        ];
        let (emotion, _) = dominant_emotion(&segments);
        assert_eq!(emotion, Emotion::Joy);
    }

    #[test]
    fn empty_timeline_is_neutral() {
        assert_eq!(dominant_emotion(&[]), (Emotion::Neutral, 0.5));
    }
}
