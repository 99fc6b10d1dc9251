use serde::{Deserialize, Serialize};

/// One contiguous recorded segment, between a start/resume and the following pause/stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track<T> {
    samples: Vec<T>,
    closed: bool,
}

impl<T> Track<T> {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
            closed: false,
        }
    }

    /// A track restored from storage. It belongs to an interval that already ended.
    pub fn closed(samples: Vec<T>) -> Self {
        Self {
            samples,
            closed: true,
        }
    }

    pub fn samples(&self) -> &[T] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn first(&self) -> Option<&T> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.samples.last()
    }

    /// The two most recent samples, oldest first.
    pub fn last_pair(&self) -> Option<(&T, &T)> {
        match self.samples.as_slice() {
            [.., previous, last] => Some((previous, last)),
            _ => None,
        }
    }
}

impl<T> Default for Track<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("no open track to append to")]
pub struct TrackClosed;

/// All tracks of one measurement, in recording order.
///
/// Only the last track can ever be open. Once a track is closed nothing is appended to it again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackCollection<T> {
    tracks: Vec<Track<T>>,
}

impl<T> TrackCollection<T> {
    pub fn new() -> Self {
        Self { tracks: Vec::new() }
    }

    /// Rebuilds a collection from stored segments. Every restored track is closed.
    pub fn from_segments(segments: impl IntoIterator<Item = Vec<T>>) -> Self {
        Self {
            tracks: segments.into_iter().map(Track::closed).collect(),
        }
    }

    /// Starts a new segment. An open segment is closed first.
    pub fn open_track(&mut self) {
        self.close_current();
        self.tracks.push(Track::new());
    }

    pub fn close_current(&mut self) {
        if let Some(track) = self.tracks.last_mut() {
            track.closed = true;
        }
    }

    pub fn append(&mut self, sample: T) -> Result<&Track<T>, TrackClosed> {
        match self.tracks.last_mut() {
            Some(track) if !track.closed => {
                track.samples.push(sample);
                Ok(track)
            }
            _ => Err(TrackClosed),
        }
    }

    pub fn is_receiving(&self) -> bool {
        self.tracks.last().is_some_and(|track| !track.closed)
    }

    pub fn current(&self) -> Option<&Track<T>> {
        self.tracks.last()
    }

    /// Index of the last track, which is the one receiving samples while running.
    pub fn current_index(&self) -> Option<usize> {
        self.tracks.len().checked_sub(1)
    }

    pub fn get(&self, index: usize) -> Option<&Track<T>> {
        self.tracks.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track<T>> {
        self.tracks.iter()
    }

    pub fn count(&self) -> usize {
        self.tracks.len()
    }

    pub fn sample_count(&self) -> usize {
        self.tracks.iter().map(Track::len).sum()
    }
}

impl<T> Default for TrackCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_needs_open_track() {
        let mut tracks = TrackCollection::new();
        assert_eq!(tracks.append(1), Err(TrackClosed));

        tracks.open_track();
        tracks.append(1).unwrap();
        tracks.append(2).unwrap();
        tracks.close_current();
        assert_eq!(tracks.append(3), Err(TrackClosed));

        tracks.open_track();
        tracks.append(4).unwrap();

        assert_eq!(tracks.count(), 2);
        assert_eq!(tracks.get(0).unwrap().samples(), &[1, 2]);
        assert_eq!(tracks.get(1).unwrap().samples(), &[4]);
        assert!(tracks.get(0).unwrap().is_closed());
        assert!(tracks.is_receiving());
        assert_eq!(TrackClosed.to_string(), "no open track to append to");
    }

    #[test]
    fn opening_closes_previous_track() {
        let mut tracks = TrackCollection::<u8>::new();
        tracks.open_track();
        tracks.open_track();
        assert!(tracks.get(0).unwrap().is_closed());
        assert!(!tracks.get(1).unwrap().is_closed());
        assert_eq!(tracks.current_index(), Some(1));
    }

    #[test]
    fn restored_segments_are_closed() {
        let tracks = TrackCollection::from_segments(vec![vec![1, 2, 3], vec![], vec![4]]);
        assert_eq!(tracks.count(), 3);
        assert_eq!(tracks.sample_count(), 4);
        assert!(!tracks.is_receiving());
        assert!(tracks.iter().all(Track::is_closed));
    }

    #[test]
    fn last_pair_of_track() {
        let mut tracks = TrackCollection::new();
        tracks.open_track();
        assert_eq!(tracks.append(1).unwrap().last_pair(), None);
        assert_eq!(tracks.append(2).unwrap().last_pair(), Some((&1, &2)));
        assert_eq!(tracks.append(3).unwrap().last_pair(), Some((&2, &3)));
    }
}
