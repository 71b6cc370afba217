//! Tests for log level selection and subscriber installation

#[cfg(test)]
mod tests {
    use spatialmotif::io::logging::{init, level_for};

    // Tests the level implied by quiet and verbosity flags
    // Verified by letting verbosity override quiet
    #[test]
    fn test_level_for() {
        assert_eq!(level_for(false, 0), "warn");
        assert_eq!(level_for(false, 1), "info");
        assert_eq!(level_for(false, 2), "debug");
        assert_eq!(level_for(false, 3), "trace");
        assert_eq!(level_for(false, 9), "trace");
        assert_eq!(level_for(true, 3), "error");
    }

    // Tests that a second installation is refused
    // Verified by using init instead of try_init
    #[test]
    fn test_init_once() {
        init(true, 0);
        assert!(!init(false, 2));
    }
}
