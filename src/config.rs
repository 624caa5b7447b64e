//! Built-in defaults and the effective configuration of a run.

use std::collections::HashSet;
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::paths::{ResolutionPolicy, SearchPaths};

/// Environment variable holding extra search directories, in platform
/// path-list syntax.
pub const SEARCH_PATH_ENV: &str = "BUNDLE_DLLS_SEARCH_PATH";

/// Executable used to read import tables.
pub const DEFAULT_OBJDUMP: &str = "objdump";

/// Executable used to compress bundled libraries.
pub const DEFAULT_UPX: &str = "upx";

/// Searched after any user-supplied directories. `""` is the working directory.
pub const DEFAULT_SEARCH_PATHS: &[&str] = &[
    "",
    "/usr/bin",
    "/mingw64/bin",
    "/usr/x86_64-w64-mingw32/bin",
    "/usr/x86_64-w64-mingw32/sys-root/mingw/bin",
    "/usr/i686-w64-mingw32/bin",
    "/usr/i686-w64-mingw32/sys-root/mingw/bin",
];

/// DLLs shipped with Windows itself. These are never inspected or copied.
pub const DEFAULT_BLACKLIST: &[&str] = &[
    "advapi32.dll",
    "avicap32.dll",
    "avrt.dll",
    "bcrypt.dll",
    "comctl32.dll",
    "comdlg32.dll",
    "crypt32.dll",
    "d3d11.dll",
    "d3d9.dll",
    "dbghelp.dll",
    "dnsapi.dll",
    "dwmapi.dll",
    "dwrite.dll",
    "dxgi.dll",
    "gdi32.dll",
    "gdiplus.dll",
    "glu32.dll",
    "hid.dll",
    "imm32.dll",
    "iphlpapi.dll",
    "kernel32.dll",
    "mpr.dll",
    "msimg32.dll",
    "msvcrt.dll",
    "mswsock.dll",
    "netapi32.dll",
    "ntdll.dll",
    "ole32.dll",
    "oleaut32.dll",
    "opengl32.dll",
    "psapi.dll",
    "rpcrt4.dll",
    "secur32.dll",
    "setupapi.dll",
    "shell32.dll",
    "shlwapi.dll",
    "user32.dll",
    "userenv.dll",
    "usp10.dll",
    "uxtheme.dll",
    "version.dll",
    "winmm.dll",
    "winspool.drv",
    "wldap32.dll",
    "ws2_32.dll",
    "wsock32.dll",
];

/// Library names treated as platform-provided. Matching ignores case.
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    names: HashSet<String>,
}

impl Blacklist {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut blacklist = Self::default();
        blacklist.extend(names);
        blacklist
    }

    pub fn extend<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.names
            .extend(names.into_iter().map(|n| n.as_ref().to_lowercase()));
    }

    pub fn contains(&self, lib_name: &str) -> bool {
        self.names.contains(&lib_name.to_lowercase())
    }
}

/// Everything one run needs, built fresh from the defaults plus overrides.
#[derive(Debug, Clone)]
pub struct Config {
    pub search_paths: SearchPaths,
    pub blacklist: Blacklist,
    pub policy: ResolutionPolicy,
    pub objdump: String,
    pub upx: String,
    pub copy: bool,
    pub compress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            search_paths: SearchPaths::new(DEFAULT_SEARCH_PATHS.iter().copied()),
            blacklist: Blacklist::new(DEFAULT_BLACKLIST),
            policy: ResolutionPolicy::FailOnMissing,
            objdump: DEFAULT_OBJDUMP.to_string(),
            upx: DEFAULT_UPX.to_string(),
            copy: false,
            compress: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend `dirs` to the search path; the first one gets highest priority.
    pub fn with_search_paths<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.search_paths.prepend(dirs);
        self
    }

    /// Prepend the directories listed in [`SEARCH_PATH_ENV`], if set.
    pub fn with_env_search_paths(self) -> Self {
        match env::var_os(SEARCH_PATH_ENV) {
            Some(value) => {
                let dirs: Vec<PathBuf> = env::split_paths(&value)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect();
                self.with_search_paths(dirs)
            }
            None => self,
        }
    }

    pub fn with_blacklist<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.blacklist.extend(names);
        self
    }

    pub fn with_policy(mut self, policy: ResolutionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_objdump(mut self, program: impl Into<String>) -> Self {
        self.objdump = program.into();
        self
    }

    pub fn with_upx(mut self, program: impl Into<String>) -> Self {
        self.upx = program.into();
        self
    }

    pub fn with_copy(mut self, copy: bool) -> Self {
        self.copy = copy;
        self
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Reject option combinations that cannot run.
    pub fn validate(&self) -> Result<()> {
        if self.compress && !self.copy {
            return Err(Error::Configuration(
                "compression requires copying (--upx needs --copy)".to_string(),
            ));
        }
        Ok(())
    }
}
