#[macro_export]
/**
 A compile time assert, mirroring `static_assert` from C++

 # Examples
 ```
 use dirshim::const_assert;
 const CONSTANT_VALUE:usize=4096;
 const_assert!(2 + 2 == 4);
 const_assert!(size_of::<u32>() >= 4, "u32 must be 4 bytes!");
 const_assert!(CONSTANT_VALUE > 0, "CONSTANT_VALUE must be positive");
 ```
*/
macro_rules! const_assert {
    ($cond:expr $(,)?) => {
        const _: () = {
            if !$cond {
                panic!(concat!("const assertion failed: ", stringify!($cond)));
            }
        };
    };
    ($cond:expr, $($arg:tt)+) => {
        const _: () = {
            if !$cond {
                panic!($($arg)+);
            }
        };
    };
}

/**
 Macro to create a const from an env var with compile-time parsing,

 Uses `option_env` under the hood, so it can catch rustc build environment variables.

 Example usage:
 ```
 use dirshim::const_from_env;
 const_from_env!(MYVAR: usize = "DIRSHIM_NOT_A_REAL_VAR", 4096);
 assert_eq!(MYVAR, 4096); // 4096 is the default value if the environment variable is not set
 ```

 # Notes
 - The value is parsed at compile time
 - Environment variables must contain only numeric characters
*/
#[macro_export]
#[allow(clippy::doc_markdown)]
macro_rules! const_from_env {
    ($(#[$meta:meta])* $name:ident: $t:ty = $env:expr, $default:expr) => {
        $(#[$meta])*
        pub const $name: $t = {
            #[allow(clippy::single_call_fn)]
            #[allow(clippy::indexing_slicing)] //this will panic at compile time, intentionally.
            const fn parse_env(s: &str) -> $t {
                let mut n: $t = 0;
                let s_bytes = s.as_bytes();
                let mut i = 0;

                while i < s_bytes.len() {
                    let b = s_bytes[i];
                    match b {
                        b'0'..=b'9' => {
                            n = n * 10 + (b - b'0') as $t;
                        }
                        _ => panic!(concat!("Invalid numeric value in environment variable: ", stringify!($env))),
                    }
                    i += 1;
                }
                n
            }

            match option_env!($env) {
                Some(val) => parse_env(val),
                None => $default as _,
            }
        };
    };
}

/// Reads `errno` and hands it back negated, the way the emulated kernel reports failure.
macro_rules! neg_errno {
    () => {{
        -(std::io::Error::last_os_error()
            .raw_os_error()
            .unwrap_or(libc::EIO) as isize)
    }};
}

/// Calls a stat-like function on a `CStr` path, yielding `Ok(libc::stat)` or `Err(-errno)`
macro_rules! stat_syscall {
    ($syscall:ident, $path_ptr:expr) => {{
        let mut stat_buf = core::mem::MaybeUninit::<libc::stat>::uninit();
        // SAFETY: the path is a valid NUL terminated `CStr` and the out pointer is writable
        let res = unsafe { libc::$syscall($path_ptr, stat_buf.as_mut_ptr()) };

        if res == 0 {
            // SAFETY: If the return code is 0, we know it's been initialised properly
            Ok(unsafe { stat_buf.assume_init() })
        } else {
            Err(neg_errno!())
        }
    }};
}
