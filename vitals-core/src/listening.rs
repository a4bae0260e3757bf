//! Derived view state for the listening page. Pure functions over the
//! selection store and the cached playing state; nothing here does I/O.

use crate::error::ApiError;
use crate::models::{Album, CurrentAlbumState};
use crate::selection::SelectionState;

/// What the listening page's cover slot shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlbumDisplay {
    /// A concrete album: the in-progress selection, or the server's
    /// playing album.
    Album(Album),
    Loading,
    NotPlaying,
}

/// Resolve the cover slot. Precedence: an in-progress selection beats
/// everything, then an in-flight fetch, then the server's answer.
pub fn album_display(
    selection: &SelectionState,
    current: Option<&CurrentAlbumState>,
    is_fetching: bool,
) -> AlbumDisplay {
    if let Some(album) = &selection.selected_album {
        return AlbumDisplay::Album(album.clone());
    }
    if is_fetching {
        return AlbumDisplay::Loading;
    }
    match current {
        Some(state) => match &state.album {
            Some(album) => AlbumDisplay::Album(album.clone()),
            None => AlbumDisplay::NotPlaying,
        },
        // Nothing cached and nothing in flight (the fetch failed): keep
        // the loading slot rather than claiming "not playing".
        None => AlbumDisplay::Loading,
    }
}

/// Record sides are lettered: side 0 is "Side A".
pub fn side_label(side: u32) -> String {
    let letter = (b'A' + (side % 26) as u8) as char;
    format!("Side {letter}")
}

/// One line per failed named result, for a page-level error list.
pub fn error_lines<'a>(
    entries: impl IntoIterator<Item = (&'a str, Option<&'a ApiError>)>,
) -> Vec<String> {
    entries
        .into_iter()
        .filter_map(|(name, error)| error.map(|err| format!("Error in {name}: {}", err.message())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn album(catalog: &str) -> Album {
        Album {
            catalog: catalog.to_string(),
            title: "Remain in Light".to_string(),
            artist: "Talking Heads".to_string(),
            num_discs: 1,
            album_cover_url: None,
        }
    }

    fn selection_of(album: Album) -> SelectionState {
        SelectionState {
            selected_album: Some(album),
            selected_side: Some(0),
        }
    }

    #[test]
    fn selection_wins_over_everything() {
        let playing = CurrentAlbumState {
            album: Some(album("SERVER")),
            side: Some(0),
        };
        let display = album_display(&selection_of(album("PICKED")), Some(&playing), true);
        assert_eq!(display, AlbumDisplay::Album(album("PICKED")));
    }

    #[test]
    fn fetching_beats_cached_data() {
        let playing = CurrentAlbumState {
            album: Some(album("SERVER")),
            side: Some(0),
        };
        let display = album_display(&SelectionState::default(), Some(&playing), true);
        assert_eq!(display, AlbumDisplay::Loading);
    }

    #[test]
    fn server_album_shows_when_idle() {
        let playing = CurrentAlbumState {
            album: Some(album("SERVER")),
            side: Some(1),
        };
        let display = album_display(&SelectionState::default(), Some(&playing), false);
        assert_eq!(display, AlbumDisplay::Album(album("SERVER")));
    }

    #[test]
    fn null_album_means_not_playing() {
        let display = album_display(
            &SelectionState::default(),
            Some(&CurrentAlbumState::default()),
            false,
        );
        assert_eq!(display, AlbumDisplay::NotPlaying);
    }

    #[test]
    fn no_data_and_no_fetch_stays_loading() {
        let display = album_display(&SelectionState::default(), None, false);
        assert_eq!(display, AlbumDisplay::Loading);
    }

    #[test]
    fn side_labels_are_lettered() {
        assert_eq!(side_label(0), "Side A");
        assert_eq!(side_label(1), "Side B");
        assert_eq!(side_label(3), "Side D");
    }

    #[test]
    fn error_lines_skip_healthy_results() {
        let err = ApiError::Status {
            status: 500,
            message: Some("matcher crashed".into()),
        };
        let lines = error_lines([
            ("setAlbum", None),
            ("albumMatch", Some(&err)),
            ("stopPlay", None),
        ]);
        assert_eq!(lines, vec!["Error in albumMatch: matcher crashed"]);
    }

    #[test]
    fn error_lines_empty_when_all_healthy() {
        let healthy: Option<&ApiError> = None;
        assert!(error_lines([("setAlbum", healthy), ("stopPlay", healthy)]).is_empty());
    }
}
