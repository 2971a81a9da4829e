//! The fixed hardening step table.
//!
//! Each step is a record: a state key, a label, a shell check that exits 0
//! when the step is already in place, and an apply plan. The table is data;
//! `application::services::hardening` interprets it against a transport.

use crate::domain::shell::quote;

pub const SSHD_CONFIG: &str = "/etc/ssh/sshd_config";
pub const SSHD_BACKUP: &str = "/etc/ssh/sshd_config.bak";
pub const SSH_MANAGED_MARKER: &str = "# bunkr-managed";
pub const DEFAULT_ADMIN_USER: &str = "bunkr";
pub const DEFAULT_SSH_PORT: u16 = 2222;

/// Exits 0 while another process holds the dpkg frontend lock.
pub const APT_LOCK_HELD: &str = "fuser /var/lib/dpkg/lock-frontend >/dev/null 2>&1";
/// Makes apt itself wait for the lock during package installs.
pub const APT_LOCK_CONF_PATH: &str = "/etc/apt/apt.conf.d/99-bunkr-lock-wait";
pub const APT_LOCK_CONF: &str = "DPkg::Lock::Timeout \"120\";\n";

const APT_INSTALL: &str = "DEBIAN_FRONTEND=noninteractive apt-get -o DPkg::Lock::Timeout=120 install -y";

const SYSCTL_PATH: &str = "/etc/sysctl.d/99-bunkr.conf";
const SYSCTL_CONF: &str = "\
# bunkr kernel hardening
net.ipv4.conf.all.rp_filter = 1
net.ipv4.conf.default.rp_filter = 1
net.ipv4.icmp_echo_ignore_broadcasts = 1
net.ipv4.conf.all.accept_redirects = 0
net.ipv4.conf.default.accept_redirects = 0
net.ipv6.conf.all.accept_redirects = 0
net.ipv4.conf.all.send_redirects = 0
net.ipv4.conf.default.send_redirects = 0
net.ipv4.conf.all.accept_source_route = 0
net.ipv4.conf.default.accept_source_route = 0
net.ipv4.tcp_syncookies = 1
";

const AUTO_UPGRADES_PATH: &str = "/etc/apt/apt.conf.d/20auto-upgrades";
const AUTO_UPGRADES_CONF: &str = "\
APT::Periodic::Update-Package-Lists \"1\";
APT::Periodic::Unattended-Upgrade \"1\";
";

/// Inputs that shape the step table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardeningConfig {
    pub ssh_port: u16,
    pub admin_user: String,
}

impl Default for HardeningConfig {
    fn default() -> Self {
        Self {
            ssh_port: DEFAULT_SSH_PORT,
            admin_user: DEFAULT_ADMIN_USER.to_string(),
        }
    }
}

/// One unit of apply work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Run(String),
    Write {
        path: String,
        content: String,
        mode: u32,
    },
}

/// How a step is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Apply {
    /// Run the actions in order; the first failure fails the step.
    Actions(Vec<Action>),
    /// Reconfigure the SSH daemon with backup, validation and rollback.
    SshDaemon(SshDaemonPlan),
}

/// Edits and probes for the SSH daemon step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshDaemonPlan {
    pub port: u16,
    /// Idempotent in-place edits of `sshd_config`.
    pub edits: Vec<String>,
}

impl SshDaemonPlan {
    /// Keep the first pristine copy; later runs must not overwrite it.
    #[must_use]
    pub fn backup_command(&self) -> String {
        format!("test -f {SSHD_BACKUP} || cp -p {SSHD_CONFIG} {SSHD_BACKUP}")
    }

    #[must_use]
    pub fn restore_command(&self) -> String {
        format!("cp {SSHD_BACKUP} {SSHD_CONFIG}")
    }

    #[must_use]
    pub fn validate_command(&self) -> &'static str {
        "sshd -t"
    }

    /// Exits 0 when systemd socket activation owns the listening socket.
    #[must_use]
    pub fn socket_active_command(&self) -> &'static str {
        "systemctl is-active --quiet ssh.socket"
    }

    /// Hand the port back to the daemon so `Port` in `sshd_config` applies.
    #[must_use]
    pub fn disable_socket_command(&self) -> &'static str {
        "systemctl disable --now ssh.socket && systemctl enable ssh.service"
    }

    #[must_use]
    pub fn restart_command(&self) -> &'static str {
        "systemctl restart sshd 2>/dev/null || systemctl restart ssh"
    }

    #[must_use]
    pub fn listening_command(&self) -> String {
        format!("ss -tln | grep -q ':{} '", self.port)
    }
}

/// A hardening step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Stable key in `State.hardening.steps`.
    pub name: &'static str,
    pub label: &'static str,
    /// Exits 0 when the step is already applied.
    pub check: String,
    pub apply: Apply,
}

/// State keys in execution order.
pub const STEP_NAMES: [&str; 7] = [
    "sudo_user",
    "ssh_hardening",
    "firewall",
    "fail2ban",
    "unattended_upgrades",
    "sysctl",
    "swap",
];

fn run(cmd: impl Into<String>) -> Action {
    Action::Run(cmd.into())
}

fn write(path: &str, content: impl Into<String>, mode: u32) -> Action {
    Action::Write {
        path: path.to_string(),
        content: content.into(),
        mode,
    }
}

/// Set `key value` in `sshd_config`, uncommenting or appending as needed.
fn sshd_option(key: &str, value: &str) -> String {
    format!(
        "sed -i -E 's/^#?[[:space:]]*{key}[[:space:]].*/{key} {value}/' {SSHD_CONFIG} && \
         (grep -q '^{key} ' {SSHD_CONFIG} || echo '{key} {value}' >> {SSHD_CONFIG})"
    )
}

fn sudo_user(user: &str) -> Step {
    let u = quote(user);
    let home = format!("/home/{user}");
    Step {
        name: "sudo_user",
        label: "Sudo user created",
        check: format!(
            "id -u {u} >/dev/null 2>&1 && test -s {home}/.ssh/authorized_keys && test -f /etc/sudoers.d/{u}"
        ),
        apply: Apply::Actions(vec![
            run(format!(
                "id -u {u} >/dev/null 2>&1 || adduser --disabled-password --gecos '' {u}"
            )),
            run(format!("usermod -aG sudo {u}")),
            write(
                &format!("/etc/sudoers.d/{user}"),
                format!("{user} ALL=(ALL) NOPASSWD:ALL\n"),
                0o440,
            ),
            run(format!("install -d -m 700 -o {u} -g {u} {home}/.ssh")),
            run(format!(
                "cp /root/.ssh/authorized_keys {home}/.ssh/authorized_keys"
            )),
            run(format!(
                "chown {u}:{u} {home}/.ssh/authorized_keys && chmod 600 {home}/.ssh/authorized_keys"
            )),
            run(format!("su - {u} -c whoami")),
        ]),
    }
}

fn ssh_hardening(user: &str, port: u16) -> Step {
    let port_s = port.to_string();
    let mut edits: Vec<String> = [
        ("Port", port_s.as_str()),
        ("PermitRootLogin", "no"),
        ("PasswordAuthentication", "no"),
        ("PubkeyAuthentication", "yes"),
        ("X11Forwarding", "no"),
        ("MaxAuthTries", "3"),
    ]
    .iter()
    .map(|(k, v)| sshd_option(k, v))
    .collect();
    edits.push(format!(
        "grep -q '^AllowUsers' {SSHD_CONFIG} || echo 'AllowUsers {user}' >> {SSHD_CONFIG}"
    ));
    edits.push(format!(
        "grep -q '^{SSH_MANAGED_MARKER}' {SSHD_CONFIG} || echo '{SSH_MANAGED_MARKER}' >> {SSHD_CONFIG}"
    ));

    Step {
        name: "ssh_hardening",
        label: "SSH hardened",
        check: format!("grep -q '^{SSH_MANAGED_MARKER}' {SSHD_CONFIG}"),
        apply: Apply::SshDaemon(SshDaemonPlan { port, edits }),
    }
}

fn firewall(port: u16) -> Step {
    Step {
        name: "firewall",
        label: "Firewall configured",
        check: format!(
            "ufw status | grep -q 'Status: active' && ufw status | grep -qE '^{port}(/tcp)? '"
        ),
        apply: Apply::Actions(vec![
            run(format!("{APT_INSTALL} ufw")),
            run("ufw default deny incoming"),
            run("ufw default allow outgoing"),
            run("ufw allow 22/tcp"),
            run(format!("ufw allow {port}/tcp")),
            run("ufw allow 80/tcp"),
            run("ufw allow 443/tcp"),
            run("ufw --force enable"),
        ]),
    }
}

fn fail2ban(port: u16) -> Step {
    Step {
        name: "fail2ban",
        label: "Fail2ban installed",
        check: "systemctl is-active --quiet fail2ban".to_string(),
        apply: Apply::Actions(vec![
            run(format!("{APT_INSTALL} fail2ban")),
            write(
                "/etc/fail2ban/jail.d/bunkr.conf",
                format!("[sshd]\nenabled = true\nport = 22,{port}\n"),
                0o644,
            ),
            run("systemctl enable fail2ban"),
            run("systemctl restart fail2ban"),
        ]),
    }
}

fn unattended_upgrades() -> Step {
    Step {
        name: "unattended_upgrades",
        label: "Unattended upgrades enabled",
        check: format!(
            "dpkg -s unattended-upgrades >/dev/null 2>&1 && test -f {AUTO_UPGRADES_PATH}"
        ),
        apply: Apply::Actions(vec![
            run(format!("{APT_INSTALL} unattended-upgrades")),
            write(AUTO_UPGRADES_PATH, AUTO_UPGRADES_CONF, 0o644),
            run("dpkg-reconfigure -f noninteractive unattended-upgrades"),
        ]),
    }
}

fn sysctl() -> Step {
    Step {
        name: "sysctl",
        label: "Kernel parameters hardened",
        check: format!("test -f {SYSCTL_PATH}"),
        apply: Apply::Actions(vec![
            write(SYSCTL_PATH, SYSCTL_CONF, 0o644),
            run("sysctl --system"),
        ]),
    }
}

fn swap() -> Step {
    Step {
        name: "swap",
        label: "Swap configured",
        check: "swapon --show | grep -q /".to_string(),
        apply: Apply::Actions(vec![
            run(
                "test -f /swapfile || fallocate -l 1G /swapfile || dd if=/dev/zero of=/swapfile bs=1M count=1024",
            ),
            run("chmod 600 /swapfile"),
            run("mkswap /swapfile"),
            run("swapon /swapfile"),
            run(
                "grep -q '^/swapfile ' /etc/fstab || echo '/swapfile none swap sw 0 0' >> /etc/fstab",
            ),
        ]),
    }
}

/// The step table, in execution order.
#[must_use]
pub fn steps(config: &HardeningConfig) -> Vec<Step> {
    vec![
        sudo_user(&config.admin_user),
        ssh_hardening(&config.admin_user, config.ssh_port),
        firewall(config.ssh_port),
        fail2ban(config.ssh_port),
        unattended_upgrades(),
        sysctl(),
        swap(),
    ]
}
