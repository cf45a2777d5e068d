//! Upstart job rendering

use crate::config::ResolvedConfig;

/// Render the upstart job that runs the active release
pub fn render(config: &ResolvedConfig) -> String {
    let mut env = format!("NODE_ENV={}", config.node_env);
    if !config.app_env.trim().is_empty() {
        env.push(' ');
        env.push_str(config.app_env.trim());
    }

    format!(
        "#!upstart\n\
         description \"{app} node app\"\n\
         author      \"beam\"\n\
         \n\
         start on runlevel [2345]\n\
         stop on shutdown\n\
         \n\
         respawn\n\
         respawn limit 99 5\n\
         \n\
         script\n\
         cd {link} && exec sudo -u {user} {env} {runtime} {entry} 2>> {err} 1>> {std}\n\
         end script\n",
        app = config.app_name,
        link = config.current_link_path(),
        user = config.node_user,
        env = env,
        runtime = config.runtime_binary,
        entry = config.app_entry_path(),
        err = config.err_log_path(),
        std = config.std_log_path(),
    )
}
