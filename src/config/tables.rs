//! Built-in alias and routing tables.
//!
//! These cover the name variants models emit most often. Both tables are
//! plain data handed to the dispatcher at construction; configuration files
//! may extend or override individual entries but the merged result is
//! immutable for the lifetime of the process.

use std::collections::HashMap;

/// Free-form name variant -> canonical capability name.
///
/// Keys are stored pre-normalized (lowercase, underscores) except for a few
/// dot-compound forms that the resolver looks up verbatim.
pub fn default_aliases() -> HashMap<String, String> {
    let entries: &[(&str, &str)] = &[
        // read_file
        ("readfile", "read_file"),
        ("read_file", "read_file"),
        ("open_file", "read_file"),
        ("cat_file", "read_file"),
        ("cat", "read_file"),
        ("view_file", "read_file"),
        ("file_read", "read_file"),
        ("filesystem.read", "read_file"),
        ("fs.read", "read_file"),
        ("fs_read", "read_file"),
        // write_file
        ("writefile", "write_file"),
        ("write_file", "write_file"),
        ("save_file", "write_file"),
        ("create_file", "write_file"),
        ("file_write", "write_file"),
        ("filesystem.write", "write_file"),
        ("fs.write", "write_file"),
        ("fs_write", "write_file"),
        // list_directory
        ("ls", "list_directory"),
        ("dir", "list_directory"),
        ("listdir", "list_directory"),
        ("list_dir", "list_directory"),
        ("list_files", "list_directory"),
        ("filesystem.list", "list_directory"),
        ("fs.list", "list_directory"),
        // web_search
        ("websearch", "web_search"),
        ("search_web", "web_search"),
        ("web.search", "web_search"),
        ("internet_search", "web_search"),
        ("google", "web_search"),
        ("google_search", "web_search"),
        // search_code
        ("grep", "search_code"),
        ("code_search", "search_code"),
        ("codebase_search", "search_code"),
        ("search.code", "search_code"),
        // search_files
        ("find", "search_files"),
        ("find_files", "search_files"),
        ("file_search", "search_files"),
        ("search.files", "search_files"),
        // run_command
        ("shell", "run_command"),
        ("bash", "run_command"),
        ("sh", "run_command"),
        ("exec", "run_command"),
        ("terminal", "run_command"),
        ("execute_command", "run_command"),
        ("shell.run", "run_command"),
        // run_code
        ("python", "run_code"),
        ("eval", "run_code"),
        ("code_interpreter", "run_code"),
        ("execute_code", "run_code"),
        // http_get
        ("fetch", "http_get"),
        ("fetch_url", "http_get"),
        ("curl", "http_get"),
        ("get_url", "http_get"),
        ("http.get", "http_get"),
        ("browse", "http_get"),
        // current_time
        ("time", "current_time"),
        ("now", "current_time"),
        ("get_time", "current_time"),
        ("get_current_time", "current_time"),
        ("time.now", "current_time"),
        // list_capabilities
        ("list_tools", "list_capabilities"),
        ("tools", "list_capabilities"),
        ("help", "list_capabilities"),
        ("capabilities", "list_capabilities"),
        ("tools.list", "list_capabilities"),
    ];

    entries
        .iter()
        .map(|(alias, canonical)| (alias.to_string(), canonical.to_string()))
        .collect()
}

/// Canonical capability name -> owning remote service id.
///
/// Anything absent here (and absent from the local registry) fails loudly at
/// execution time rather than being dropped.
pub fn default_routes() -> HashMap<String, String> {
    let entries: &[(&str, &str)] = &[
        ("web_search", "search"),
        ("search_code", "search"),
        ("http_get", "web"),
    ];

    entries
        .iter()
        .map(|(name, service)| (name.to_string(), service.to_string()))
        .collect()
}
