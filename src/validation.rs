//! Position and move validation
//!
//! Both checks delegate to shakmaty. Any parse or legality failure is
//! reported as `false`; these functions never return errors.

use shakmaty::{fen::Fen, uci::UciMove, CastlingMode, Chess, Position};

/// Parse a FEN into a standard chess position, if it is legal
fn parse_position(fen: &str) -> Option<Chess> {
    let setup = fen.trim().parse::<Fen>().ok()?;
    setup.into_position::<Chess>(CastlingMode::Standard).ok()
}

/// Whether `fen` describes a structurally and rule-legal chess position
pub fn is_valid_position(fen: &str) -> bool {
    parse_position(fen).is_some()
}

/// Whether `mv` (UCI coordinate notation) is in the legal-move set of `fen`
pub fn is_legal_move(fen: &str, mv: &str) -> bool {
    let Some(pos) = parse_position(fen) else {
        return false;
    };
    let Ok(candidate) = mv.trim().parse::<UciMove>() else {
        return false;
    };

    pos.legal_moves()
        .iter()
        .any(|legal| legal.to_uci(CastlingMode::Standard) == candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn test_start_position_is_valid() {
        assert!(is_valid_position(START));
    }

    #[test]
    fn test_garbage_is_invalid() {
        for fen in [
            "",
            "not-a-fen",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1",
            "rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/ppppXppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1",
        ] {
            assert!(!is_valid_position(fen), "{fen:?} should be rejected");
        }
    }

    #[test]
    fn test_rule_illegal_positions_are_invalid() {
        // No black king
        assert!(!is_valid_position("8/8/8/8/8/8/8/4K3 w - - 0 1"));
        // Two white kings
        assert!(!is_valid_position("4k3/8/8/8/8/8/8/3KK3 w - - 0 1"));
        // Pawn on the back rank
        assert!(!is_valid_position("4k2P/8/8/8/8/8/8/4K3 w - - 0 1"));
        // Side not to move is in check
        assert!(!is_valid_position("4k3/8/8/8/8/8/4R3/4K3 w - - 0 1"));
    }

    #[test]
    fn test_sparse_legal_position_is_valid() {
        assert!(is_valid_position("4k3/8/8/8/8/8/8/4K3 b - - 12 40"));
    }

    #[test]
    fn test_pawn_moves_from_start() {
        assert!(is_legal_move(START, "e2e4"));
        assert!(is_legal_move(START, "g1f3"));
        assert!(!is_legal_move(START, "e2e5"));
        assert!(!is_legal_move(START, "e7e5"));
    }

    #[test]
    fn test_malformed_move_is_not_legal() {
        for mv in ["", "e2", "zz99", "(none)", "0000", "e2e4e4"] {
            assert!(!is_legal_move(START, mv), "{mv:?} should be rejected");
        }
    }

    #[test]
    fn test_castling_in_king_notation() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        assert!(is_legal_move(fen, "e1g1"));
        assert!(is_legal_move(fen, "e1c1"));
    }

    #[test]
    fn test_promotion_requires_piece_letter() {
        let fen = "8/4P3/8/8/8/8/k7/4K3 w - - 0 1";
        assert!(is_legal_move(fen, "e7e8q"));
        assert!(is_legal_move(fen, "e7e8n"));
        assert!(!is_legal_move(fen, "e7e8"));
    }

    #[test]
    fn test_pinned_piece_cannot_move() {
        // White knight on e2 pinned by the rook on e8
        let fen = "4r2k/8/8/8/8/8/4N3/4K3 w - - 0 1";
        assert!(!is_legal_move(fen, "e2c3"));
        assert!(is_legal_move(fen, "e1d1"));
    }

    #[test]
    fn test_en_passant_capture() {
        let fen = "4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 2";
        assert!(is_legal_move(fen, "e5d6"));
    }

    #[test]
    fn test_invalid_fen_means_no_legal_moves() {
        assert!(!is_legal_move("not-a-fen", "e2e4"));
    }
}
