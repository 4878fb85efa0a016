use super::timeline::Track;

/// Whether `track` sounds this tick. While any track is soloed only soloed
/// tracks play (a soloed track plays even when muted); otherwise every
/// unmuted track plays.
pub fn audible(track: &Track, all_tracks: &[Track]) -> bool {
    resolve(track, any_solo(all_tracks))
}

// One flag per track, in track order.
pub fn audible_tracks(tracks: &[Track]) -> Vec<bool> {
    let soloing = any_solo(tracks);
    tracks.iter().map(|t| resolve(t, soloing)).collect()
}

pub fn any_solo(tracks: &[Track]) -> bool {
    tracks.iter().any(|t| t.state.solo)
}

fn resolve(track: &Track, soloing: bool) -> bool {
    if soloing {
        track.state.solo
    } else {
        !track.state.muted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::timeline::TrackState;
    use crate::shared::TrackName;

    fn track(name: &str, solo: bool, muted: bool) -> Track {
        let mut t = Track::new(TrackName::new(name).unwrap(), 1);
        t.state = TrackState { solo, muted, ignored: false };
        t
    }

    #[test]
    fn no_solo_follows_mute() {
        let tracks = vec![track("a", false, false), track("b", false, true)];
        assert!(audible(&tracks[0], &tracks));
        assert!(!audible(&tracks[1], &tracks));
    }

    #[test]
    fn solo_silences_everyone_else() {
        let tracks = vec![track("a", true, false), track("b", false, false), track("c", false, true)];
        assert_eq!(audible_tracks(&tracks), vec![true, false, false]);
    }

    #[test]
    fn solo_beats_own_mute() {
        let tracks = vec![track("a", true, true), track("b", false, false)];
        assert!(audible(&tracks[0], &tracks));
        assert!(!audible(&tracks[1], &tracks));
    }
}
